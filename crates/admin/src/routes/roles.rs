//! Roles and permissions. Admin only.
//!
//! Names are normalized with [`normalize_authority_name`]. The three
//! built-in roles cannot be deleted from here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Permission, Role};
use sgshop_core::{FieldErrors, Flash, roles};

use crate::api::{PermissionPayload, RolePayload};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, set_flash};
use crate::state::AppState;

use super::{degrade, finish, normalize_authority_name};

const BUILT_IN_ROLES: [&str; 3] = [roles::ADMIN, roles::STAFF, roles::CUSTOMER];

#[must_use]
pub fn is_built_in(role: &str) -> bool {
    BUILT_IN_ROLES.contains(&role)
}

// =============================================================================
// Roles
// =============================================================================

#[derive(Debug, Clone)]
pub struct RoleRowView {
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub built_in: bool,
}

impl From<&Role> for RoleRowView {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            description: role.description.clone().unwrap_or_default(),
            permissions: role
                .permissions
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            built_in: is_built_in(&role.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionChoice {
    pub name: String,
    pub checked: bool,
}

/// Role form as submitted; `permissions` repeats once per ticked box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleForm {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

impl RoleForm {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "name" => form.name = value,
                "description" => form.description = value,
                "permissions" => form.permissions.push(value),
                _ => {}
            }
        }
        form
    }

    /// # Errors
    ///
    /// Returns the field errors when the name is blank or has spaces.
    pub fn validate(&self, available: &[Permission]) -> Result<RolePayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        match normalize_authority_name(&self.name) {
            Ok(name) => {
                let mut permissions: Vec<String> = self
                    .permissions
                    .iter()
                    .map(|p| p.trim().to_uppercase())
                    .filter(|p| available.iter().any(|a| a.name == *p))
                    .collect();
                permissions.sort();
                permissions.dedup();
                Ok(RolePayload {
                    name,
                    description: FieldErrors::optional_text(Some(&self.description)),
                    permissions,
                })
            }
            Err(message) => {
                errors.add("name", message);
                Err(errors)
            }
        }
    }

    fn choices(&self, available: &[Permission]) -> Vec<PermissionChoice> {
        available
            .iter()
            .map(|p| PermissionChoice {
                name: p.name.clone(),
                checked: self.permissions.iter().any(|c| c.eq_ignore_ascii_case(&p.name)),
            })
            .collect()
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "roles/index.html")]
pub struct RolesTemplate {
    pub ctx: PageContext,
    pub roles: Vec<RoleRowView>,
    pub choices: Vec<PermissionChoice>,
    pub form: RoleForm,
    pub errors: FieldErrors,
}

#[instrument(skip(state, admin, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let token = admin.token();
    let (roles, permissions) = tokio::join!(state.api().roles(token), state.api().permissions(token));
    let roles = degrade(roles, "roles")?;
    let permissions = degrade(permissions, "permissions")?;
    let form = RoleForm::default();

    Ok(RolesTemplate {
        ctx,
        roles: roles.iter().map(RoleRowView::from).collect(),
        choices: form.choices(&permissions),
        form,
        errors: FieldErrors::new(),
    })
}

#[instrument(skip(state, admin, session, ctx, pairs))]
pub async fn create_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    ctx: PageContext,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let token = admin.token();
    let form = RoleForm::from_pairs(pairs);
    let permissions = degrade(state.api().permissions(token).await, "permissions")?;

    let payload = match form.validate(&permissions) {
        Ok(payload) => payload,
        Err(errors) => {
            let roles = degrade(state.api().roles(token).await, "roles")?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                RolesTemplate {
                    ctx,
                    roles: roles.iter().map(RoleRowView::from).collect(),
                    choices: form.choices(&permissions),
                    form,
                    errors,
                },
            )
                .into_response());
        }
    };

    let result = state.api().create_role(token, &payload).await;
    if result.is_ok() {
        tracing::info!(role = %payload.name, permissions = ?payload.permissions, "Role created");
    }
    let success = format!("Đã tạo vai trò {}", payload.name);
    Ok(finish(&session, result, &success, "Không thể tạo vai trò", "/roles")
        .await?
        .into_response())
}

#[instrument(skip(state, admin, session))]
pub async fn delete_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    if is_built_in(&name) {
        set_flash(&session, Flash::error(format!("Không thể xoá vai trò mặc định {name}"))).await;
        return Ok(Redirect::to("/roles"));
    }
    let result = state.api().delete_role(admin.token(), &name).await;
    finish(&session, result, "Đã xoá vai trò", "Không thể xoá vai trò", "/roles").await
}

// =============================================================================
// Permissions
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PermissionForm {
    /// # Errors
    ///
    /// Returns the field errors when the name is blank or has spaces.
    pub fn validate(&self) -> Result<PermissionPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        match normalize_authority_name(&self.name) {
            Ok(name) => Ok(PermissionPayload {
                name,
                description: FieldErrors::optional_text(Some(&self.description)),
            }),
            Err(message) => {
                errors.add("name", message);
                Err(errors)
            }
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "roles/permissions.html")]
pub struct PermissionsTemplate {
    pub ctx: PageContext,
    pub permissions: Vec<Permission>,
    pub form: PermissionForm,
    pub errors: FieldErrors,
}

#[instrument(skip(state, admin, ctx))]
pub async fn permissions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ctx: PageContext,
) -> Result<impl IntoResponse, AppError> {
    let permissions = degrade(state.api().permissions(admin.token()).await, "permissions")?;
    Ok(PermissionsTemplate {
        ctx,
        permissions: permissions.to_vec(),
        form: PermissionForm::default(),
        errors: FieldErrors::new(),
    })
}

#[instrument(skip(state, admin, session, ctx, form))]
pub async fn create_permission(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    ctx: PageContext,
    Form(form): Form<PermissionForm>,
) -> Result<Response, AppError> {
    let token = admin.token();
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => {
            let permissions = degrade(state.api().permissions(token).await, "permissions")?;
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                PermissionsTemplate {
                    ctx,
                    permissions: permissions.to_vec(),
                    form,
                    errors,
                },
            )
                .into_response());
        }
    };

    let result = state.api().create_permission(token, &payload).await;
    let success = format!("Đã tạo quyền {}", payload.name);
    Ok(finish(&session, result, &success, "Không thể tạo quyền", "/permissions")
        .await?
        .into_response())
}

#[instrument(skip(state, admin, session))]
pub async fn delete_permission(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    let result = state.api().delete_permission(admin.token(), &name).await;
    finish(&session, result, "Đã xoá quyền", "Không thể xoá quyền", "/permissions").await
}
