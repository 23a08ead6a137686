//! User accounts and their roles. Admin only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use sgshop_core::records::{Role, User};
use sgshop_core::{Flash, UserId, roles};

use crate::api::UserFilter;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, set_flash};
use crate::models::CurrentStaff;
use crate::state::AppState;

use super::{Pager, degrade, finish, non_blank};

#[derive(Debug, Clone)]
pub struct UserRowView {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub roles: String,
    pub active: bool,
}

impl From<&User> for UserRowView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            roles: user.role_names().join(", "),
            active: user.active,
        }
    }
}

/// One checkbox on the role form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChoice {
    pub name: String,
    pub description: String,
    pub checked: bool,
}

fn role_choices(available: &[Role], user: &User) -> Vec<RoleChoice> {
    available
        .iter()
        .map(|r| RoleChoice {
            name: r.name.clone(),
            description: r.description.clone().unwrap_or_default(),
            checked: user.has_role(&r.name),
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub ctx: PageContext,
    pub users: Vec<UserRowView>,
    pub keyword: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/show.html")]
pub struct UserShowTemplate {
    pub ctx: PageContext,
    pub user: UserRowView,
    pub choices: Vec<RoleChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub keyword: Option<String>,
    pub page: Option<u32>,
}

#[instrument(skip(state, admin, ctx))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ctx: PageContext,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = UserFilter {
        page: query.page.unwrap_or(1).max(1),
        keyword: non_blank(query.keyword.as_deref()).map(str::to_owned),
        ..UserFilter::default()
    };
    let page = degrade(state.api().users(admin.token(), &filter).await, "users")?;
    let keyword = filter.keyword.unwrap_or_default();

    Ok(UsersTemplate {
        ctx,
        users: page.content.iter().map(UserRowView::from).collect(),
        pager: Pager::new(page.view(), "/users", &[("keyword", &keyword)]),
        keyword,
    })
}

#[instrument(skip(state, admin, ctx))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ctx: PageContext,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, AppError> {
    let token = admin.token();
    let (user, available) = tokio::join!(state.api().user(token, id), state.api().roles(token));
    let user = user?;
    let available = degrade(available, "roles")?;

    Ok(UserShowTemplate {
        ctx,
        choices: role_choices(&available, &user),
        user: UserRowView::from(&user),
    })
}

/// Checked role names, kept only when the backend knows them.
///
/// Repeated `roles` keys arrive as pairs, which a plain struct cannot hold.
fn selected_roles(pairs: &[(String, String)], available: &[Role]) -> Vec<String> {
    let mut selected: Vec<String> = pairs
        .iter()
        .filter(|(k, _)| k == "roles")
        .map(|(_, v)| v.trim().to_uppercase())
        .filter(|name| available.iter().any(|r| r.name == *name))
        .collect();
    selected.sort();
    selected.dedup();
    selected
}

/// An admin may not take the admin role away from themselves.
fn drops_own_admin(admin: &CurrentStaff, target: UserId, selected: &[String]) -> bool {
    admin.user_id == Some(target) && !selected.iter().any(|r| r == roles::ADMIN)
}

#[instrument(skip(state, admin, session, form))]
pub async fn assign_roles(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<UserId>,
    Form(form): Form<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let token = admin.token();
    let back = format!("/users/{id}");
    let available = state.api().roles(token).await?;
    let selected = selected_roles(&form, &available);

    if drops_own_admin(&admin, id, &selected) {
        set_flash(&session, Flash::error("Không thể tự gỡ quyền quản trị của chính mình")).await;
        return Ok(Redirect::to(&back));
    }

    let result = state.api().assign_roles(token, id, &selected).await;
    if result.is_ok() {
        tracing::info!(user_id = %id, roles = ?selected, "Roles assigned");
    }
    finish(&session, result, "Đã cập nhật vai trò", "Không thể cập nhật vai trò", &back).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    use super::*;

    fn role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            description: None,
            permissions: Vec::new(),
        }
    }

    fn pairs(values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|v| ("roles".to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_selected_roles_filters_unknown_and_duplicates() {
        let available = vec![role("ADMIN"), role("STAFF"), role("CUSTOMER")];
        let selected = selected_roles(&pairs(&["staff", "STAFF", "ROOT", "CUSTOMER"]), &available);
        assert_eq!(selected, vec!["CUSTOMER".to_string(), "STAFF".to_string()]);
    }

    #[test]
    fn test_admin_cannot_drop_own_admin_role() {
        let admin = CurrentStaff {
            user_id: Some(UserId::new(7)),
            email: "admin@saigonshop.vn".to_string(),
            full_name: None,
            roles: vec!["ADMIN".to_string()],
            access_token: SecretString::from("t"),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(drops_own_admin(&admin, UserId::new(7), &["STAFF".to_string()]));
        assert!(!drops_own_admin(&admin, UserId::new(7), &["ADMIN".to_string()]));
        assert!(!drops_own_admin(&admin, UserId::new(8), &[]));
    }

    #[test]
    fn test_role_choices_reflect_user() {
        let user = User {
            id: UserId::new(3),
            full_name: "Trần Thị B".to_string(),
            email: "b@example.com".to_string(),
            phone: None,
            roles: vec![role("STAFF")],
            active: true,
        };
        let choices = role_choices(&[role("ADMIN"), role("STAFF")], &user);
        assert!(!choices[0].checked);
        assert!(choices[1].checked);
        assert_eq!(UserRowView::from(&user).roles, "STAFF");
    }
}
