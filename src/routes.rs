//! HTTP router: every `/api/v1` route behind API key authentication, plus the
//! public health check.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::DbPool,
    handlers::{
        categories, donors, funds, grants, health, inventory, maintenance, recurring,
        transactions,
    },
    middleware::auth::auth_middleware,
};

fn finance_routes() -> Router<DbPool> {
    Router::new()
        // Categories
        .route(
            "/categories",
            post(categories::create_category).get(categories::list_categories),
        )
        .route("/categories/tree", get(categories::category_tree))
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Funds
        .route("/funds", post(funds::create_fund).get(funds::list_funds))
        .route(
            "/funds/{id}",
            get(funds::get_fund)
                .put(funds::update_fund)
                .delete(funds::delete_fund),
        )
        .route("/funds/{id}/restore", post(funds::restore_fund))
        .route("/funds/{id}/summary", get(funds::fund_summary))
        // Donors
        .route("/donors", post(donors::create_donor).get(donors::list_donors))
        .route(
            "/donors/{id}",
            get(donors::get_donor)
                .put(donors::update_donor)
                .delete(donors::delete_donor),
        )
        .route("/donors/{id}/restore", post(donors::restore_donor))
        .route("/donors/{id}/giving", get(donors::giving_summary))
        // Grants
        .route("/grants", post(grants::create_grant).get(grants::list_grants))
        .route(
            "/grants/{id}",
            get(grants::get_grant)
                .put(grants::update_grant)
                .delete(grants::delete_grant),
        )
        .route("/grants/{id}/restore", post(grants::restore_grant))
        .route("/grants/{id}/utilization", get(grants::grant_utilization))
        // Transactions
        .route(
            "/transactions",
            post(transactions::create_transaction).get(transactions::list_transactions),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route(
            "/transactions/{id}/restore",
            post(transactions::restore_transaction),
        )
        // Recurring transactions
        .route(
            "/recurring-transactions",
            post(recurring::create_recurring).get(recurring::list_recurring),
        )
        .route(
            "/recurring-transactions/process",
            post(recurring::process_now),
        )
        .route(
            "/recurring-transactions/{id}",
            get(recurring::get_recurring)
                .put(recurring::update_recurring)
                .delete(recurring::delete_recurring),
        )
}

fn inventory_routes() -> Router<DbPool> {
    Router::new()
        .route(
            "/locations",
            post(inventory::create_location).get(inventory::list_locations),
        )
        .route("/locations/tree", get(inventory::location_tree))
        .route(
            "/locations/{id}",
            get(inventory::get_location)
                .put(inventory::update_location)
                .delete(inventory::delete_location),
        )
        .route(
            "/inventory",
            post(inventory::create_item).get(inventory::list_items),
        )
        .route(
            "/inventory/{id}",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route("/inventory/{id}/restore", post(inventory::restore_item))
        .route(
            "/inventory/{id}/adjustments",
            post(inventory::adjust_stock).get(inventory::list_adjustments),
        )
}

fn maintenance_routes() -> Router<DbPool> {
    Router::new()
        .route(
            "/buildings",
            post(maintenance::create_building).get(maintenance::list_buildings),
        )
        .route("/buildings/tree", get(maintenance::building_tree))
        .route(
            "/buildings/{id}",
            get(maintenance::get_building)
                .put(maintenance::update_building)
                .delete(maintenance::delete_building),
        )
        .route(
            "/projects",
            post(maintenance::create_project).get(maintenance::list_projects),
        )
        .route(
            "/projects/{id}",
            get(maintenance::get_project)
                .put(maintenance::update_project)
                .delete(maintenance::delete_project),
        )
        .route("/projects/{id}/restore", post(maintenance::restore_project))
        .route(
            "/work-orders",
            post(maintenance::create_work_order).get(maintenance::list_work_orders),
        )
        .route(
            "/work-orders/{id}",
            get(maintenance::get_work_order)
                .put(maintenance::update_work_order)
                .delete(maintenance::delete_work_order),
        )
        .route(
            "/work-orders/{id}/status",
            post(maintenance::change_work_order_status),
        )
        .route(
            "/work-orders/{id}/restore",
            post(maintenance::restore_work_order),
        )
        .route(
            "/service-requests",
            post(maintenance::submit_service_request).get(maintenance::list_service_requests),
        )
        .route(
            "/service-requests/{id}",
            get(maintenance::get_service_request)
                .put(maintenance::update_service_request)
                .delete(maintenance::delete_service_request),
        )
        .route(
            "/service-requests/{id}/review",
            post(maintenance::review_service_request),
        )
        .route(
            "/service-requests/{id}/convert",
            post(maintenance::convert_service_request),
        )
        .route(
            "/service-requests/{id}/restore",
            post(maintenance::restore_service_request),
        )
}

/// Build the application router.
///
/// Routes under `/api/v1` require `Authorization: Bearer <key>`; `/health`
/// is public.
pub fn build_router(pool: DbPool) -> Router {
    let api = Router::new()
        .merge(finance_routes())
        .merge(inventory_routes())
        .merge(maintenance_routes())
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            pool.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pool)
}
