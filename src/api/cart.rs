//! Student cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::cart::{AddToCart, CartEntry, CartItem, CheckoutSummary},
    AppState,
};

use super::AuthenticatedUser;

/// Items in the caller's cart
#[utoipa::path(
    get,
    path = "/cart",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Cart contents, oldest first", body = Vec<CartItem>),
        (status = 403, description = "Not a student or account inactive")
    )
)]
pub async fn list_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CartItem>>> {
    let items = state.services.cart.items(claims.user_id).await?;
    Ok(Json(items))
}

/// Add a book to the cart
#[utoipa::path(
    post,
    path = "/cart/items",
    tag = "cart",
    security(("bearer_auth" = [])),
    request_body = AddToCart,
    responses(
        (status = 201, description = "Book added", body = CartEntry),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book already in cart")
    )
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AddToCart>,
) -> AppResult<(StatusCode, Json<CartEntry>)> {
    let entry = state.services.cart.add(claims.user_id, request.book_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Remove a book from the cart
#[utoipa::path(
    delete,
    path = "/cart/items/{book_id}",
    tag = "cart",
    security(("bearer_auth" = [])),
    params(("book_id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book removed (or was not in the cart)")
    )
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.cart.remove(claims.user_id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Turn every cart entry into a loan where stock allows
#[utoipa::path(
    post,
    path = "/cart/checkout",
    tag = "cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Checkout summary", body = CheckoutSummary),
        (status = 400, description = "Cart is empty"),
        (status = 422, description = "No book in the cart could be borrowed")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<CheckoutSummary>> {
    let summary = state.services.cart.checkout(claims.user_id).await?;
    Ok(Json(summary))
}
