use crate::api::user::LeaveBalance;
use crate::auth::handlers::LoginResponse;
use crate::model::role::Role;
use crate::model::travel_request::{TravelDraft, TravelStatus};
use crate::model::user::UserSummary;
use crate::models::{LoginRequest, RejectRequest, SignupRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Travel Leave API",
        version = "1.0.0",
        description = r#"
## Travel Leave Management

Employees submit travel requests against their leave balance; managers approve or reject them.

### 🔹 Key Features
- **Travel Requests**
  - Submit a request, list your own, list your team's by status
- **Approvals**
  - Approve (days are deducted from the employee) or reject with a reason
- **Accounts**
  - First-manager bootstrap signup, manager-created accounts, leave balance lookup

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
Approval, rejection, team listings and account creation are **MANAGER** only.

### 📦 Errors
Every error body is `{"error": "<KIND>", "message": "<text>"}` with a stable `KIND`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::signup_public,

        crate::api::travel_request::create_travel,
        crate::api::travel_request::my_requests,
        crate::api::travel_request::manager_requests,
        crate::api::travel_request::get_travel,
        crate::api::travel_request::approve_travel,
        crate::api::travel_request::reject_travel,

        crate::api::user::create_user,
        crate::api::user::me,
        crate::api::user::leave_balance
    ),
    components(
        schemas(
            Role,
            TravelStatus,
            TravelDraft,
            crate::service::projection::TravelRequestView,
            RejectRequest,
            SignupRequest,
            LoginRequest,
            LoginResponse,
            UserSummary,
            LeaveBalance
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login, token refresh and bootstrap signup"),
        (name = "Travel", description = "Travel request lifecycle"),
        (name = "Users", description = "Accounts and leave balances"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
