use crate::services::auth_gate::{self, ACCESS_TOKEN_COOKIE, Credentials, GateDecision, LOGIN_PATH};
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{AUTHORIZATION, LOCATION},
};
use log::debug;
use std::{
    future::{Future, Ready, ready},
    pin::Pin,
    rc::Rc,
};

/// Redirects page requests without a credential token to the login page
pub struct AuthMw;

impl<S, B> Transform<S, ServiceRequest> for AuthMw
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
}

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let decision = {
                let cookie = req.cookie(ACCESS_TOKEN_COOKIE);
                let authorization = req
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok());

                auth_gate::decide(
                    req.path(),
                    Credentials {
                        cookie: cookie.as_ref().map(|cookie| cookie.value()),
                        authorization,
                    },
                )
            };

            match decision {
                GateDecision::Continue => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                GateDecision::RedirectToLogin => {
                    debug!("no access token for {}, redirecting to login", req.path());
                    Ok(login_redirect(req).map_into_right_body())
                }
            }
        })
    }
}

fn login_redirect(req: ServiceRequest) -> ServiceResponse {
    let http_res = HttpResponse::TemporaryRedirect()
        .insert_header((LOCATION, LOGIN_PATH))
        .finish();
    let (http_req, _) = req.into_parts();
    ServiceResponse::new(http_req, http_res)
}
