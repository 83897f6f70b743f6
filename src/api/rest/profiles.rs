use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::{list_params, non_empty};
use crate::engine::assignment::normalize_services;
use crate::engine::listing::Page;
use crate::error::AppError;
use crate::models::profile::{Customer, StaffMember, StaffRole};
use crate::models::vendor::{Location, Vendor};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vendor/register/", post(create_vendor).get(list_vendors))
        .route("/api/vendor/register/:id/", get(get_vendor).put(update_vendor))
        .route(
            "/api/customer/register/",
            post(create_customer).get(list_customers),
        )
        .route(
            "/api/customer/register/:id/",
            get(get_customer).put(update_customer),
        )
        .route("/api/staffadmin/register/", post(create_staff).get(list_staff))
        .route(
            "/api/staffadmin/register/:id/",
            get(get_staff).put(update_staff),
        )
}

#[derive(Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub categories: Vec<String>,
    pub location: Location,
}

#[derive(Deserialize)]
pub struct UpdateVendorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub location: Location,
}

#[derive(Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub role: StaffRole,
}

#[derive(Deserialize)]
pub struct UpdateStaffRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<StaffRole>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn clean_location(location: Location) -> Location {
    Location {
        state: location.state.trim().to_string(),
        district: location.district.trim().to_string(),
        block: location.block.trim().to_string(),
    }
}

fn clean_email(email: Option<String>) -> Option<String> {
    email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
}

fn vendor_categories(categories: Vec<String>) -> Result<Vec<String>, AppError> {
    if categories.is_empty() {
        return Err(AppError::BadRequest("vendor needs at least one category".to_string()));
    }
    normalize_services(categories)
}

async fn create_vendor(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVendorRequest>,
) -> Result<Json<Vendor>, AppError> {
    let vendor = Vendor {
        id: Uuid::new_v4(),
        name: non_empty(&payload.name, "name")?,
        mobile: non_empty(&payload.mobile, "mobile")?,
        email: clean_email(payload.email),
        categories: vendor_categories(payload.categories)?,
        location: clean_location(payload.location),
        active: true,
        registered_at: Utc::now(),
    };

    state.vendors.insert(vendor.id, vendor.clone());
    info!(vendor_id = %vendor.id, categories = ?vendor.categories, "vendor registered");
    Ok(Json(vendor))
}

async fn list_vendors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Vendor>>, AppError> {
    let params = list_params(
        &state,
        &params,
        &["state", "district", "block", "active"],
        &["name", "mobile", "category"],
    )?;

    let mut vendors: Vec<Vendor> = state
        .vendors
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    vendors.sort_by_key(|vendor| (vendor.registered_at, vendor.id));

    Ok(Json(params.apply(vendors)))
}

async fn get_vendor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vendor>, AppError> {
    let vendor = state
        .vendors
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("vendor {} not found", id)))?;

    Ok(Json(vendor.value().clone()))
}

async fn update_vendor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVendorRequest>,
) -> Result<Json<Vendor>, AppError> {
    let name = payload.name.as_deref().map(|name| non_empty(name, "name")).transpose()?;
    let mobile = payload
        .mobile
        .as_deref()
        .map(|mobile| non_empty(mobile, "mobile"))
        .transpose()?;
    let categories = payload.categories.map(vendor_categories).transpose()?;

    let mut vendor = state
        .vendors
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("vendor {} not found", id)))?;

    if let Some(name) = name {
        vendor.name = name;
    }
    if let Some(mobile) = mobile {
        vendor.mobile = mobile;
    }
    if payload.email.is_some() {
        vendor.email = clean_email(payload.email);
    }
    if let Some(categories) = categories {
        vendor.categories = categories;
    }
    if let Some(location) = payload.location {
        vendor.location = clean_location(location);
    }
    if let Some(active) = payload.active {
        vendor.active = active;
    }

    info!(vendor_id = %id, active = vendor.active, "vendor updated");
    Ok(Json(vendor.clone()))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    let customer = Customer {
        id: Uuid::new_v4(),
        name: non_empty(&payload.name, "name")?,
        mobile: non_empty(&payload.mobile, "mobile")?,
        email: clean_email(payload.email),
        address: payload.address.trim().to_string(),
        location: clean_location(payload.location),
        registered_at: Utc::now(),
    };

    state.customers.insert(customer.id, customer.clone());
    info!(customer_id = %customer.id, "customer registered");
    Ok(Json(customer))
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Customer>>, AppError> {
    let params = list_params(
        &state,
        &params,
        &["state", "district", "block"],
        &["name", "mobile"],
    )?;

    let mut customers: Vec<Customer> = state
        .customers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    customers.sort_by_key(|customer| (customer.registered_at, customer.id));

    Ok(Json(params.apply(customers)))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .customers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("customer {} not found", id)))?;

    Ok(Json(customer.value().clone()))
}

async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    let name = payload.name.as_deref().map(|name| non_empty(name, "name")).transpose()?;
    let mobile = payload
        .mobile
        .as_deref()
        .map(|mobile| non_empty(mobile, "mobile"))
        .transpose()?;

    let mut customer = state
        .customers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("customer {} not found", id)))?;

    if let Some(name) = name {
        customer.name = name;
    }
    if let Some(mobile) = mobile {
        customer.mobile = mobile;
    }
    if payload.email.is_some() {
        customer.email = clean_email(payload.email);
    }
    if let Some(address) = payload.address {
        customer.address = address.trim().to_string();
    }
    if let Some(location) = payload.location {
        customer.location = clean_location(location);
    }

    Ok(Json(customer.clone()))
}

async fn create_staff(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<Json<StaffMember>, AppError> {
    let email = non_empty(&payload.email, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest(format!("invalid email: {email}")));
    }

    let name = non_empty(&payload.name, "name")?;

    let member = match state.staff_emails.entry(email.clone()) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict(format!("email {email} already registered")));
        }
        Entry::Vacant(slot) => {
            let member = StaffMember {
                id: Uuid::new_v4(),
                name,
                email,
                role: payload.role,
                active: true,
                registered_at: Utc::now(),
            };
            // Stored before the email slot is released.
            state.staff.insert(member.id, member.clone());
            slot.insert(member.id);
            member
        }
    };

    info!(staff_id = %member.id, role = ?member.role, "staff member registered");
    Ok(Json(member))
}

async fn list_staff(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<StaffMember>>, AppError> {
    let params = list_params(&state, &params, &["role", "active"], &["name", "email"])?;

    let mut staff: Vec<StaffMember> = state
        .staff
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    staff.sort_by_key(|member| (member.registered_at, member.id));

    Ok(Json(params.apply(staff)))
}

async fn get_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StaffMember>, AppError> {
    let member = state
        .staff
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    Ok(Json(member.value().clone()))
}

async fn update_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<Json<StaffMember>, AppError> {
    let name = payload.name.as_deref().map(|name| non_empty(name, "name")).transpose()?;

    let mut member = state
        .staff
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff member {} not found", id)))?;

    if let Some(name) = name {
        member.name = name;
    }
    if let Some(role) = payload.role {
        member.role = role;
    }
    if let Some(active) = payload.active {
        member.active = active;
    }

    info!(staff_id = %id, role = ?member.role, active = member.active, "staff member updated");
    Ok(Json(member.clone()))
}
