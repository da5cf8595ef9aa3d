mod geolocation;
mod http;
mod notify;

pub use self::geolocation::{
    Geolocation, GeolocationError, GeolocationOperation, GeolocationResult, Position,
};
pub use self::http::{
    response_body, response_status, ApiRequest, Http, HttpHeaders, HttpMethod, HttpResponse,
    HttpResult, RequestError, ValidatedUrl,
};
pub use self::notify::{
    NotificationPayload, Notify, NotifyError, NotifyOperation, NotifyResult,
};

pub use crux_core::render::Render;

// The Effect derive expands to code naming these two.
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub geolocation: Geolocation<Event>,
    pub notify: Notify<Event>,
}
