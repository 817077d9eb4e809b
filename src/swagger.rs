use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CreditEntryKind, PaymentMode, UserRole};
use crate::handlers;
use crate::models::*;
use crate::pricing::OrderTotals;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::change_password,
        handlers::user::list_users,
        handlers::user::create_user,
        handlers::user::update_user,
        handlers::user::set_active,
        handlers::user::reset_password,
        handlers::menu::list_items,
        handlers::menu::list_categories,
        handlers::menu::get_item,
        handlers::menu::create_item,
        handlers::menu::update_item,
        handlers::menu::set_availability,
        handlers::menu::restock,
        handlers::menu::low_stock,
        handlers::menu::import_csv,
        handlers::menu::list_toppings,
        handlers::menu::create_topping,
        handlers::menu::update_topping,
        handlers::cart::get_cart,
        handlers::cart::add_line,
        handlers::cart::remove_line,
        handlers::cart::clear_cart,
        handlers::order::submit_order,
        handlers::order::list_orders,
        handlers::order::today_orders,
        handlers::order::get_order,
        handlers::customer::list_customers,
        handlers::customer::create_customer,
        handlers::customer::outstanding,
        handlers::customer::get_customer,
        handlers::customer::update_customer,
        handlers::customer::record_payment,
        handlers::customer::adjust_balance,
        handlers::customer::ledger,
        handlers::report::sales_summary,
        handlers::report::item_sales,
        handlers::report::customer_analysis,
        handlers::report::menu_performance,
        handlers::report::payment_breakdown,
        handlers::report::export_orders,
        handlers::backup::list_backups,
        handlers::backup::create_backup,
        handlers::backup::delete_backup,
        handlers::backup::restore_backup,
    ),
    components(
        schemas(
            Page,
            UserRole,
            PaymentMode,
            CreditEntryKind,
            LoginRequest,
            RefreshRequest,
            ChangePasswordRequest,
            CreateUserRequest,
            UpdateUserRequest,
            SetActiveRequest,
            ResetPasswordRequest,
            UserResponse,
            AuthResponse,
            TokenResponse,
            MenuItemResponse,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            SetAvailabilityRequest,
            RestockRequest,
            ToppingResponse,
            CreateToppingRequest,
            UpdateToppingRequest,
            CsvImportResult,
            AddCartLineRequest,
            CartLineView,
            CartView,
            OrderTotals,
            SubmitOrderRequest,
            OrderLineResponse,
            OrderResponse,
            TodayOrdersResponse,
            PaginatedOrderResponse,
            CustomerResponse,
            CreateCustomerRequest,
            UpdateCustomerRequest,
            RecordPaymentRequest,
            AdjustBalanceRequest,
            CreditEntryResponse,
            CreditUpdateResponse,
            OutstandingSummary,
            PaginatedCustomerResponse,
            PaginatedCreditEntryResponse,
            ReportPeriod,
            SalesSummaryRow,
            ItemSalesRow,
            CustomerAnalysisRow,
            MenuPerformanceRow,
            PaymentModeRow,
            BackupInfo,
            RestoreResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "auth", description = "Staff authentication API"),
        (name = "user", description = "Staff account management API"),
        (name = "menu", description = "Menu, stock and topping API"),
        (name = "cart", description = "Per-staff cart API"),
        (name = "order", description = "Order submission and history API"),
        (name = "customer", description = "Customer and credit ledger API"),
        (name = "report", description = "Sales report API"),
        (name = "backup", description = "Database backup API"),
    ),
    info(
        title = "Kiosk Backend API",
        version = "1.0.0",
        description = "Food kiosk point-of-sale REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
