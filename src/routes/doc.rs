use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
        orders::{
            InventoryWarning, OrderHistoryRow, OrderItemInput, OrderList, OrderPlaced,
            OrderSummary, OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, ProductWithCategory, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewList},
        staff::{
            CustomerList, CustomerSummary, DashboardStats, OrderItemWithImage, StaffOrderDetail,
            StaffOrderList, StaffOrderSummary,
        },
        wishlist::{ToggleResult, WishlistProduct, WishlistProductList},
    },
    models::{Category, Order, OrderItem, Product, Review, User},
    response::{ApiResponse, Meta},
    routes::{auth, categories, health, orders, params, products, reviews, staff, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
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

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_profile,
        auth::change_password,
        categories::list_categories,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::update_status,
        orders::list_user_orders,
        reviews::list_reviews,
        reviews::submit_review,
        wishlist::list_wishlist,
        wishlist::list_wishlist_ids,
        wishlist::toggle_wishlist,
        wishlist::remove_from_wishlist,
        staff::dashboard,
        staff::list_orders,
        staff::get_order,
        staff::update_order_status,
        staff::list_products,
        staff::list_customers,
        staff::list_categories
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderItem,
            Review,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductWithCategory,
            ProductList,
            PlaceOrderRequest,
            OrderItemInput,
            InventoryWarning,
            OrderPlaced,
            OrderSummary,
            OrderList,
            OrderWithItems,
            OrderHistoryRow,
            UpdateOrderStatusRequest,
            CreateReviewRequest,
            ReviewList,
            WishlistProduct,
            WishlistProductList,
            ToggleResult,
            DashboardStats,
            StaffOrderSummary,
            StaffOrderList,
            OrderItemWithImage,
            StaffOrderDetail,
            CustomerSummary,
            CustomerList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::ReviewListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderPlaced>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<ReviewList>,
            ApiResponse<WishlistProductList>,
            ApiResponse<DashboardStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Order placement and lifecycle"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Wishlist", description = "Wishlist toggles"),
        (name = "Staff", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
