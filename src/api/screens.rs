use axum::{
    extract::{Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::db::SessionContext;
use crate::nav::{navigate, Access, Screen};

#[derive(Debug, Serialize)]
pub struct ScreenInfo {
    pub screen: Screen,
    pub title: &'static str,
    pub access: Access,
    pub transitions: &'static [Screen],
}

impl From<Screen> for ScreenInfo {
    fn from(screen: Screen) -> Self {
        Self {
            screen,
            title: screen.title(),
            access: screen.requires(),
            transitions: screen.transitions(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScreenQuery {
    /// Screen the caller is navigating from
    pub from: Option<String>,
}

/// The whole navigation table
pub async fn list_screens() -> Json<Vec<ScreenInfo>> {
    Json(Screen::ALL.into_iter().map(ScreenInfo::from).collect())
}

/// One screen. With `?from=` the move is checked against the caller's session.
pub async fn get_screen(
    session: Option<SessionContext>,
    Path(name): Path<String>,
    Query(query): Query<ScreenQuery>,
) -> Result<Json<ScreenInfo>, ApiError> {
    let screen: Screen = name.parse()?;

    if let Some(from) = query.from {
        let from: Screen = from.parse()?;
        navigate(from, screen, session.as_ref())?;
    }

    Ok(Json(ScreenInfo::from(screen)))
}
