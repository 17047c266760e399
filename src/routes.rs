use actix_identity::Identity;
use actix_web::{
    delete, get, patch, post,
    http::Method,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder,
};
use serde_json::json;

use crate::{
    auth::{CurrentUser, OwnerSession, TenantSession},
    db::{self, DueOrdering, TenantRecord},
    errors::AppError,
    structs::{
        ComplaintStatusUpdate, Login, MarkPaid, MarkPaidBulk, NewComplaint, NewDue, NewTenant,
        Role, SessionUser,
    },
    utils, AppState,
};

const OWNER_NAME: &str = "Property Owner";
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .service(login_handler)
            .service(logout_handler)
            .service(session_handler)
            .service(rooms_handler)
            .service(create_tenant_handler)
            .service(tenant_detail_handler)
            .service(delete_tenant_handler)
            .service(generate_dues_handler)
            .service(due_summary_handler)
            .service(mark_dues_paid_handler)
            .service(create_due_handler)
            .service(mark_due_paid_handler)
            .service(complaints_handler)
            .service(update_complaint_handler)
            .service(raise_complaint_handler)
            .service(tenant_dashboard_handler),
    );
}

pub async fn not_found_handler(req_method: Method) -> HttpResponse {
    match req_method {
        Method::GET | Method::POST | Method::PATCH | Method::DELETE => {
            HttpResponse::NotFound().json(json!({ "error": "Not found" }))
        }
        _ => HttpResponse::MethodNotAllowed().json(json!({ "error": "Method not allowed" })),
    }
}

// ---------- session ----------

#[post("/login")]
pub async fn login_handler(
    web::Json(form): web::Json<Login>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_owned(),
        ));
    }

    if email == state.config.owner_email && form.password == state.config.owner_password {
        CurrentUser::Owner.login(&request)?;
        log::info!("Owner logged in");
        let user = SessionUser {
            id: 0,
            name: OWNER_NAME.to_owned(),
            email,
            role: Role::Owner,
            room_id: None,
        };
        return Ok(HttpResponse::Ok().json(json!({ "user": user, "redirect": "/dashboard/owner" })));
    }

    let tenant = db::find_tenant_by_email(&state.db_pool, &email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let stored = tenant.pwd_hash.clone();
    let verified = web::block(move || utils::verify_password(&form.password, &stored))
        .await
        .map_err(|e| AppError::PasswordError(e.to_string()))?
        .unwrap_or_else(|e| {
            log::warn!("Unreadable password hash for tenant {}: {}", tenant.id, e);
            false
        });
    if !verified {
        return Err(AppError::InvalidCredentials);
    }

    CurrentUser::Tenant(tenant.id).login(&request)?;
    log::info!("Tenant {} logged in", tenant.id);
    let user = SessionUser {
        id: tenant.id,
        name: tenant.name,
        email: tenant.email,
        role: Role::Tenant,
        room_id: Some(tenant.room_id),
    };
    Ok(HttpResponse::Ok().json(json!({ "user": user, "redirect": "/dashboard/tenant" })))
}

#[post("/logout")]
pub async fn logout_handler(identity: Option<Identity>) -> impl Responder {
    if let Some(identity) = identity {
        identity.logout();
    }
    HttpResponse::Ok().json(json!({ "success": true }))
}

/// Who the current session belongs to.
#[get("/session")]
pub async fn session_handler(user: CurrentUser) -> impl Responder {
    let (role, id) = match user {
        CurrentUser::Owner => (Role::Owner, 0),
        CurrentUser::Tenant(id) => (Role::Tenant, id),
    };
    HttpResponse::Ok().json(json!({ "role": role, "id": id }))
}

// ---------- rooms & tenants ----------

#[get("/rooms")]
pub async fn rooms_handler(
    _owner: OwnerSession,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let rooms = db::list_rooms(&state.db_pool).await?;
    Ok(HttpResponse::Ok().json(rooms))
}

#[post("/tenants")]
pub async fn create_tenant_handler(
    _owner: OwnerSession,
    web::Json(form): web::Json<NewTenant>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let name = form.name.trim();
    let email = form.email.trim().to_lowercase();
    let phone = form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Name, email and password are required".to_owned(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_owned()));
    }
    let password_len = form.password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(AppError::Validation(format!(
            "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters long"
        )));
    }
    if form.deposit.0 < 0 {
        return Err(AppError::Validation("Deposit cannot be negative".to_owned()));
    }

    let password = form.password.clone();
    let pwd_hash = web::block(move || utils::hash_password(&password))
        .await
        .map_err(|e| AppError::PasswordError(e.to_string()))?
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::PasswordError(e.to_string())
        })?;

    let record = TenantRecord {
        name,
        email: &email,
        pwd_hash: &pwd_hash,
        phone,
        room_id: form.room_id,
        deposit: form.deposit.0,
    };
    let id = db::create_tenant(&state.db_pool, &record, state.now()).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

#[get("/tenants/{id}")]
pub async fn tenant_detail_handler(
    _owner: OwnerSession,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let overview = db::get_tenant_overview(&state.db_pool, path.into_inner(), DueOrdering::NewestFirst)
        .await?
        .ok_or(AppError::NotFound("Tenant"))?;
    Ok(HttpResponse::Ok().json(overview))
}

#[delete("/tenants/{id}")]
pub async fn delete_tenant_handler(
    _owner: OwnerSession,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    db::delete_tenant(&state.db_pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// ---------- dues ----------

#[post("/dues")]
pub async fn create_due_handler(
    _owner: OwnerSession,
    web::Json(form): web::Json<NewDue>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let month = form.month.trim();
    if month.is_empty() {
        return Err(AppError::Validation("Month is required".to_owned()));
    }
    if form.amount.0 <= 0 {
        return Err(AppError::Validation("Amount must be positive".to_owned()));
    }

    let id = db::create_due(
        &state.db_pool,
        form.tenant_id,
        form.amount.0,
        month,
        form.due_date,
        state.now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

#[patch("/dues")]
pub async fn mark_due_paid_handler(
    _owner: OwnerSession,
    web::Json(form): web::Json<MarkPaid>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = form
        .id
        .ok_or_else(|| AppError::Validation("Due ID is required".to_owned()))?;
    db::mark_due_paid(&state.db_pool, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[post("/dues/paid")]
pub async fn mark_dues_paid_handler(
    _owner: OwnerSession,
    web::Json(form): web::Json<MarkPaidBulk>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let updated = db::mark_dues_paid(&state.db_pool, &form.ids).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "updated": updated })))
}

#[post("/dues/generate")]
pub async fn generate_dues_handler(
    _owner: OwnerSession,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let run = db::generate_monthly_dues(
        &state.db_pool,
        state.now(),
        state.config.due_cutoff_day,
        state.config.default_rent,
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "month": run.month,
        "generated": run.generated,
    })))
}

#[get("/dues/summary")]
pub async fn due_summary_handler(
    _owner: OwnerSession,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let summary = db::due_summary(&state.db_pool).await?;
    Ok(HttpResponse::Ok().json(summary))
}

// ---------- complaints ----------

#[get("/complaints")]
pub async fn complaints_handler(
    _owner: OwnerSession,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let complaints = db::list_complaints(&state.db_pool).await?;
    Ok(HttpResponse::Ok().json(complaints))
}

#[patch("/complaints")]
pub async fn update_complaint_handler(
    _owner: OwnerSession,
    web::Json(form): web::Json<ComplaintStatusUpdate>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    db::update_complaint_status(&state.db_pool, form.id, form.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[post("/tenant/complaints")]
pub async fn raise_complaint_handler(
    TenantSession(tenant_id): TenantSession,
    web::Json(form): web::Json<NewComplaint>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_owned()));
    }
    let id = db::create_complaint(
        &state.db_pool,
        tenant_id,
        title,
        form.description.trim(),
        state.now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "id": id })))
}

#[get("/tenant/dashboard")]
pub async fn tenant_dashboard_handler(
    TenantSession(tenant_id): TenantSession,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let overview = db::get_tenant_overview(&state.db_pool, tenant_id, DueOrdering::PendingFirst)
        .await?
        .ok_or(AppError::NotFound("Tenant"))?;
    Ok(HttpResponse::Ok().json(overview))
}
