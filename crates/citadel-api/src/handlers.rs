//! # citadel-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core `Forum`.
//! Handlers only unpack requests and shape responses; every rule lives in core.

use crate::error::ApiError;
use actix_web::{web, HttpResponse};
use citadel_core::models::{CommentId, PostDraft, PostId, PostPatch};
use citadel_core::Forum;
use serde::Deserialize;
use serde_json::json;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub forum: Forum,
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub username: String,
    pub board: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub value: i32,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
    #[serde(default)]
    pub username: String,
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
    pub username: String,
}

/// Body of the delete endpoints: who is asking.
#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub board: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub username: Option<String>,
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "pong" }))
}

pub async fn register(data: web::Data<AppState>, body: web::Json<Credentials>) -> ApiResult {
    let user = data.forum.register(&body.username, &body.password).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "user created", "user": user })))
}

pub async fn login(data: web::Data<AppState>, body: web::Json<Credentials>) -> ApiResult {
    let user = data.forum.login(&body.username, &body.password).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "login successful", "user": user })))
}

/// Lists scrolls, newest first, optionally narrowed to one board.
pub async fn list_posts(data: web::Data<AppState>, query: web::Query<BoardQuery>) -> ApiResult {
    let posts = data.forum.list_posts(query.board.as_deref()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// A single scroll with its marks and the viewer's vote.
pub async fn get_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ViewerQuery>,
) -> ApiResult {
    let detail = data
        .forum
        .get_post(PostId(path.into_inner()), query.username.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn create_post(
    data: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> ApiResult {
    let body = body.into_inner();
    let draft = PostDraft {
        title: body.title,
        content: body.content,
        board: body.board,
        link: body.link,
    };
    let post = data.forum.create_post(&body.username, draft).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn update_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdatePostRequest>,
) -> ApiResult {
    let body = body.into_inner();
    let patch = PostPatch {
        title: body.title,
        content: body.content,
    };
    let post = data
        .forum
        .update_post(PostId(path.into_inner()), &body.username, patch)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ActorRequest>,
) -> ApiResult {
    data.forum
        .delete_post(PostId(path.into_inner()), &body.username)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "scroll burned" })))
}

pub async fn cast_vote(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<VoteRequest>,
) -> ApiResult {
    let tally = data
        .forum
        .cast_vote(&body.username, PostId(path.into_inner()), body.value)
        .await?;
    Ok(HttpResponse::Ok().json(tally))
}

pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<CommentRequest>,
) -> ApiResult {
    let comment = data
        .forum
        .add_comment(
            PostId(path.into_inner()),
            body.parent_id,
            &body.username,
            &body.content,
        )
        .await?;
    Ok(HttpResponse::Created().json(comment))
}

/// The marks of a scroll as nested reply trees.
pub async fn comment_forest(data: web::Data<AppState>, path: web::Path<i64>) -> ApiResult {
    let forest = data.forum.comment_forest(PostId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(forest))
}

pub async fn update_comment(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateCommentRequest>,
) -> ApiResult {
    let comment = data
        .forum
        .update_comment(CommentId(path.into_inner()), &body.username, &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn delete_comment(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ActorRequest>,
) -> ApiResult {
    data.forum
        .delete_comment(CommentId(path.into_inner()), &body.username)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "mark erased" })))
}
