use axum::Json;
use serde::Serialize;

use crate::{
    capabilities::{PROVIDERS, ProviderEntry},
    params::{STYLES, StyleOption},
};

#[derive(Debug, Serialize)]
pub struct ProviderCatalog {
    pub providers: &'static [ProviderEntry],
    pub styles: &'static [StyleOption],
}

pub async fn providers() -> Json<ProviderCatalog> {
    Json(ProviderCatalog {
        providers: PROVIDERS,
        styles: STYLES,
    })
}
