// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod assets;
pub mod component;
pub mod config;
pub mod controller;
pub mod exception;
pub mod multipart;
pub mod param;
pub mod path;
pub mod request;
pub mod response;
pub mod trains;
pub mod url;
pub mod util;

pub use assets::Assets;
pub use component::{Component, ComponentAggregation, Container, Page};
pub use config::Config;
pub use controller::Controller;
pub use exception::Exception;
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use url::Url;
pub use util::HtmlBuilder;
