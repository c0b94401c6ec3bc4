use crate::api::{ApiError, ClientFactory};
use crate::auth::{evaluate, PermissionRequirement};
use crate::middleware::{with_ssr_auth, PageResult};
use crate::models::User;
use crate::session::{context::ME_PATH, RequestContext};
use crate::AppState;
use askama::Template;
use axum::{extract::State, response::Response};
use std::sync::Arc;

pub fn metrics_requirement() -> PermissionRequirement {
    PermissionRequirement::new()
        .permissions(["metrics.list"])
        .roles(["administrator"])
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user: User,
    pub can_see_metrics: bool,
}

#[derive(Template)]
#[template(path = "metrics.html")]
pub struct MetricsTemplate {
    pub user: User,
}

async fn current_user(clients: &ClientFactory, context: &RequestContext) -> Result<User, ApiError> {
    clients.build(Some(context)).get(ME_PATH).await
}

async fn dashboard_props(
    clients: Arc<ClientFactory>,
    context: RequestContext,
) -> Result<PageResult<DashboardTemplate>, ApiError> {
    let user = current_user(&clients, &context).await?;
    let can_see_metrics = evaluate(&user, &metrics_requirement());

    Ok(PageResult::Props(DashboardTemplate {
        user,
        can_see_metrics,
    }))
}

async fn metrics_props(
    clients: Arc<ClientFactory>,
    context: RequestContext,
) -> Result<PageResult<MetricsTemplate>, ApiError> {
    let user = current_user(&clients, &context).await?;
    Ok(PageResult::Props(MetricsTemplate { user }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    context: RequestContext,
) -> Response {
    let clients = state.clients.clone();
    let page = with_ssr_auth(
        move |context: RequestContext| dashboard_props(clients.clone(), context),
        None,
    );

    page.respond(&context).await
}

pub async fn metrics(
    State(state): State<AppState>,
    context: RequestContext,
) -> Response {
    let clients = state.clients.clone();
    let page = with_ssr_auth(
        move |context: RequestContext| metrics_props(clients.clone(), context),
        Some(metrics_requirement()),
    );

    page.respond(&context).await
}
