use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::AdminSession;
use super::error::{ApiError, ValidationErrorBuilder};
use super::payments::PaymentDetails;
use super::validation::{
    validate_min_length, validate_person_name, validate_phone, validate_pincode, validate_price,
    validate_quantity, validate_required, validate_stock,
};
use crate::db::{CreateMedicineRequest, Medicine, UpdateStockRequest};
use crate::engine::{pharmacy_order, round2, OrderTotals};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MedicineQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartLine {
    pub medicine_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeliveryAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub address: DeliveryAddress,
    pub payment: PaymentDetails,
}

#[derive(Debug, Serialize)]
pub struct OrderLine {
    pub medicine_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub line_total: f64,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub lines: Vec<OrderLine>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub deliver_to: String,
    pub paid_by: String,
}

/// Catalog, optionally filtered by `?q=` substring
pub async fn list_medicines(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MedicineQuery>,
) -> Result<Json<Vec<Medicine>>, ApiError> {
    let medicines = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => Medicine::search(&state.db, q).await?,
        _ => Medicine::list_all(&state.db).await?,
    };
    Ok(Json(medicines))
}

/// Add a medicine to the inventory (admin)
pub async fn create_medicine(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Json(req): Json<CreateMedicineRequest>,
) -> Result<(StatusCode, Json<Medicine>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_required(&req.name, "Medicine name"));
    errors.check("price", validate_price(req.price));
    errors.check("stock", validate_stock(req.stock));
    errors.finish()?;

    let mut conn = state.db.acquire().await?;
    let medicine = Medicine::insert(&mut conn, req.name.trim(), round2(req.price), req.stock).await?;

    tracing::info!(
        medicine_id = medicine.id,
        medicine = %medicine.name,
        stock = medicine.stock,
        by = %admin.username,
        "Medicine added"
    );

    Ok((StatusCode::CREATED, Json(medicine)))
}

/// Overwrite the stock count of a medicine (admin)
pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    AdminSession(admin): AdminSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStockRequest>,
) -> Result<Json<Medicine>, ApiError> {
    validate_stock(req.stock).map_err(|e| ApiError::validation_field("stock", e))?;

    if !Medicine::set_stock(&state.db, id, req.stock).await? {
        return Err(ApiError::not_found(format!("Medicine {} not found", id)));
    }
    tracing::info!(medicine_id = id, stock = req.stock, by = %admin.username, "Stock updated");

    let medicine = Medicine::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Medicine {} not found", id)))?;
    Ok(Json(medicine))
}

fn check_address(errors: &mut ValidationErrorBuilder, address: &DeliveryAddress) {
    match validate_min_length(&address.name, "Name", 2) {
        Ok(()) => errors.check("address.name", validate_person_name(&address.name)),
        Err(e) => errors.add("address.name", e),
    };
    errors.check("address.phone", validate_phone(&address.phone));
    errors.check("address.address", validate_min_length(&address.address, "Address", 5));
    errors.check("address.city", validate_min_length(&address.city, "City", 2));
    errors.check("address.pincode", validate_pincode(&address.pincode));
}

/// Price a cart for delivery. Stock counts are left untouched.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<OrderSummary>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if req.cart.is_empty() {
        errors.add("cart", "Cart is empty");
    }
    for (i, line) in req.cart.iter().enumerate() {
        errors.check(&format!("cart[{}].quantity", i), validate_quantity(line.quantity));
    }
    check_address(&mut errors, &req.address);
    req.payment.check(&mut errors);
    errors.finish()?;

    let mut lines = Vec::with_capacity(req.cart.len());
    for line in &req.cart {
        let medicine = Medicine::find(&state.db, line.medicine_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medicine {} not found", line.medicine_id)))?;
        lines.push(OrderLine {
            medicine_id: medicine.id,
            line_total: round2(medicine.price * line.quantity as f64),
            name: medicine.name,
            price: medicine.price,
            quantity: line.quantity,
        });
    }

    let priced: Vec<(f64, i64)> = lines.iter().map(|l| (l.price, l.quantity)).collect();
    let totals = pharmacy_order(&priced);
    let address = &req.address;
    let deliver_to = format!(
        "{}, {}, {} - {}",
        address.name.trim(),
        address.address.trim(),
        address.city.trim(),
        address.pincode.trim()
    );
    let paid_by = req.payment.describe();

    tracing::info!(
        lines = lines.len(),
        total = totals.total,
        paid_by = %paid_by,
        "Pharmacy order placed"
    );

    Ok(Json(OrderSummary {
        lines,
        totals,
        deliver_to,
        paid_by,
    }))
}
