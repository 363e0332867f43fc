use actix_web::{
    HttpRequest,
    HttpResponse,
    Responder,
    http::{StatusCode, header::{LOCATION, HeaderValue}},
};
use futures::future::{self, Future, IntoFuture};

/// `201 Created` pointing at the new resource, with the body rendered by
/// the wrapped responder.
pub struct Created<T>(pub String, pub T);

impl<T> Responder for Created<T>
where
    T: Responder + 'static,
{
    type Error = actix_web::Error;
    type Future = Box<dyn Future<Item = HttpResponse, Error = actix_web::Error>>;

    fn respond_to(self, req: &HttpRequest) -> Self::Future {
        let Created(location, body) = self;

        let location = match HeaderValue::from_str(&location) {
            Ok(location) => location,
            Err(err) => return Box::new(future::err::<HttpResponse, _>(err.into())),
        };

        Box::new(body.respond_to(req)
            .into_future()
            .map_err(Into::into)
            .map(move |mut rsp| {
                *rsp.status_mut() = StatusCode::CREATED;
                rsp.headers_mut().insert(LOCATION, location);
                rsp
            }))
    }
}
