//! Order composition, payment and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, UserId};
use domain::{
    AddItem, CommandResult, CreateOrder, FulfillGroup, MarkReady, Order, OrderService,
    OrderStatus, OrderTree, PayOrder, UnfulfilledGroup,
};
use order_store::OrderQuery;
use serde::{Deserialize, Serialize};

use crate::Backend;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<B: Backend> {
    pub order_service: OrderService<B::Repository, B::Catalog, B::Ledger>,
}

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct FulfillGroupRequest {
    #[serde(default)]
    pub item_ids: Vec<String>,
    #[serde(default)]
    pub counts: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub status: String,
    pub price_cents: i64,
    pub price: String,
    pub tree: OrderTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().map(|u| u.to_string()),
            status: order.status().to_string(),
            price_cents: order.price().cents(),
            price: order.price().to_string(),
            tree: order.tree().clone(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            version: order.version().as_i64(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub order: OrderResponse,
    pub price_added_cents: i64,
    pub price_added: String,
}

impl From<CommandResult> for CommandResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            order: OrderResponse::from(&result.order),
            price_added_cents: result.price_added.cents(),
            price_added: result.price_added.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct DetailsResponse {
    pub details: String,
}

// -- Handlers --

/// POST /orders — create an empty order, optionally owned by a user.
#[tracing::instrument(skip(state, req))]
pub async fn create<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let user_id = req
        .user_id
        .as_deref()
        .map(|id| parse_uuid(id, "user_id").map(UserId::from_uuid))
        .transpose()?;

    let order = state
        .order_service
        .create_order(CreateOrder::new(user_id))
        .await?;

    let response = OrderCreatedResponse {
        order_id: order.id().to_string(),
        status: order.status().to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /orders — list orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(user_id) = params.user_id.as_deref() {
        query = query.user_id(UserId::from_uuid(parse_uuid(user_id, "user_id")?));
    }
    if let Some(status) = params.status.as_deref() {
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))?;
        query = query.status(status.as_str());
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let orders = state.order_service.list_orders(query).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id} — load an order with its tree.
#[tracing::instrument(skip(state))]
pub async fn get<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.get_order(parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/items — add root items.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let result = state
        .order_service
        .add_item(AddItem::new(order_id, req.item_id, req.quantity))
        .await?;
    Ok(Json(result.into()))
}

/// POST /orders/{id}/groups/{path} — fill the ingredient group at `path`.
#[tracing::instrument(skip(state, req))]
pub async fn fulfill_group<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path((id, path)): Path<(String, String)>,
    Json(req): Json<FulfillGroupRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let item_ids = req.item_ids.into_iter().map(ItemId::from).collect();
    let result = state
        .order_service
        .fulfill_group(FulfillGroup::new(order_id, path, item_ids, req.counts))
        .await?;
    Ok(Json(result.into()))
}

/// GET /orders/{id}/details — receipt text.
#[tracing::instrument(skip(state))]
pub async fn details<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let details = state.order_service.details(parse_order_id(&id)?).await?;
    Ok(Json(DetailsResponse { details }))
}

/// GET /orders/{id}/unfulfilled — first group still waiting for a selection, or `null`.
#[tracing::instrument(skip(state))]
pub async fn unfulfilled<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<Option<UnfulfilledGroup>>, ApiError> {
    let group = state
        .order_service
        .unfulfilled(parse_order_id(&id)?)
        .await?;
    Ok(Json(group))
}

/// POST /orders/{id}/pay — deduct stock and mark the order paid.
#[tracing::instrument(skip(state))]
pub async fn pay<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .pay(PayOrder::new(parse_order_id(&id)?))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/ready — mark a paid order ready.
#[tracing::instrument(skip(state))]
pub async fn ready<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .mark_ready(MarkReady::new(parse_order_id(&id)?))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    parse_uuid(id, "order id").map(OrderId::from_uuid)
}

fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field} format: {e}")))
}
