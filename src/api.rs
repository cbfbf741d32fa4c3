use crate::{
    backend_client::BackendClient,
    chart::{ChartDatum, DEFAULT_WIDTH_PX, EnrollmentTrendChart},
    config::AppConfig,
    http_client::{ErrorBody, handle_service_result, internal_server_error},
    services::password_reset::PasswordResetService,
};
use actix_files::NamedFile;
use actix_web::{HttpResponse, Responder, web};
use log::{debug, error};
use serde::Deserialize;

const LOGIN_PAGE_FILE: &str = "Universal_Login.html";

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    width: Option<u32>,
}

#[derive(Clone)]
pub struct Api<Backend>
where
    Backend: BackendClient,
{
    pub backend_client: Backend,
}

impl<Backend> Api<Backend>
where
    Backend: BackendClient,
{
    pub fn new(backend_client: Backend) -> Self {
        Api { backend_client }
    }

    /// Forward a password reset to the backend and relay its answer
    ///
    /// The body is taken raw so that malformed JSON ends up as a 500 like any
    /// other failure instead of the extractor's 400.
    pub async fn reset_password_with_otp(
        body: web::Bytes,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("reset_password_with_otp() called");

        let input = match PasswordResetService::parse(&body) {
            Ok(input) => input,
            Err(e) => {
                error!("reset_password_with_otp failed: {e:#}");
                return internal_server_error();
            }
        };

        let request = match PasswordResetService::validate(input) {
            Ok(request) => request,
            Err(missing) => {
                debug!("reset_password_with_otp rejected: {missing}");
                return HttpResponse::BadRequest().json(ErrorBody {
                    error: missing.message(),
                });
            }
        };

        handle_service_result(
            api.backend_client.reset_password_with_otp(request).await,
            "reset_password_with_otp",
        )
    }

    pub async fn enrollment_trend_chart(
        body: web::Json<Vec<ChartDatum>>,
        query: web::Query<ChartQuery>,
    ) -> impl Responder {
        debug!("enrollment_trend_chart() called with {} points", body.len());

        let width = query.width.unwrap_or(DEFAULT_WIDTH_PX);
        let chart = EnrollmentTrendChart::new(body.into_inner());

        HttpResponse::Ok()
            .content_type("image/svg+xml")
            .body(chart.render(width))
    }

    pub async fn login_page() -> actix_web::Result<NamedFile> {
        Ok(NamedFile::open(
            AppConfig::get().paths.pages_dir.join(LOGIN_PAGE_FILE),
        )?)
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }

    pub async fn healthcheck() -> impl Responder {
        debug!("healthcheck() called");
        HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
    }
}
