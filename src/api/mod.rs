// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod form;
pub mod handlers;
pub mod http_server;

pub use errors::{ApiError, ErrorResponse};
pub use form::{FilePart, FormFields};
pub use handlers::{AnswerResponse, HealthResponse, ServiceInfo, TranslateResponse};
pub use http_server::{create_app, serve};
