use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shopcart API",
        version = "0.1.0",
        description = r#"
# Shopcart API

Accounts, items, carts, vouchers and order checkout.

## Authentication

Obtain a token from `POST /api/v1/login` and send it on every other request:

```
Authorization: Bearer <your-jwt-token>
```

Item and voucher mutations require an `ADMIN` account.

## Responses

Successful responses are wrapped as `{"message": "Success!", "data": ...}`.
Errors use `{"error", "message", "request_id", "timestamp"}`. Checkout
reports an empty cart or insufficient stock as `412 Precondition Failed`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "accounts", description = "Registration and login"),
        (name = "items", description = "Item catalogue"),
        (name = "carts", description = "Cart lines of the calling account"),
        (name = "vouchers", description = "Discount vouchers"),
        (name = "orders", description = "Checkout and order history")
    ),
    paths(
        crate::handlers::accounts::register,
        crate::handlers::accounts::login,
        crate::handlers::items::create_item,
        crate::handlers::carts::add_to_cart,
        crate::handlers::vouchers::create_voucher,
        crate::handlers::orders::checkout,
    ),
    components(
        schemas(
            crate::handlers::accounts::RegisterRequest,
            crate::handlers::accounts::LoginRequest,
            crate::handlers::items::CreateItemRequest,
            crate::handlers::items::UpdateItemRequest,
            crate::handlers::carts::AddToCartRequest,
            crate::handlers::carts::UpdateCartRequest,
            crate::handlers::vouchers::CreateVoucherRequest,
            crate::handlers::vouchers::UpdateVoucherRequest,
            crate::handlers::orders::CheckoutBody,
            crate::auth::TokenResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_checkout_and_bearer_scheme() {
        let doc = ApiDocV1::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"]["/api/v1/orders"]["post"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(json["components"]["schemas"]["CheckoutBody"].is_object());
    }
}
