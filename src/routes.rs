use actix_web::{web, Either, HttpResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::projection::{project_thread_detail, project_thread_summary, ThreadDetail, ThreadSummary};
use crate::store::BoardStore;

pub const THREAD_REPORTED: &str = "Thread has been reported.";
pub const REPLY_REPORTED: &str = "Reply has been reported.";
pub const DELETE_SUCCESSFUL: &str = "Delete successful.";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/threads/{board}")
                    .route(web::get().to(list_threads))
                    .route(web::post().to(create_thread))
                    .route(web::put().to(report_thread))
                    .route(web::delete().to(delete_thread)),
            )
            .service(
                web::resource("/replies/{board}")
                    .route(web::get().to(get_thread))
                    .route(web::post().to(create_reply))
                    .route(web::put().to(report_reply))
                    .route(web::delete().to(delete_reply)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState { pub store: BoardStore }

/// Request bodies arrive either as JSON or as an urlencoded form.
type Body<T> = Either<web::Json<T>, web::Form<T>>;

fn body<T>(b: Body<T>) -> T {
    match b {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewThreadForm {
    #[serde(default)] pub text: String,
    #[serde(default)] pub delete_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportThreadForm {
    #[serde(default, alias = "thread_id")] pub report_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteThreadForm {
    #[serde(default)] pub thread_id: String,
    #[serde(default)] pub delete_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewReplyForm {
    #[serde(default)] pub thread_id: String,
    #[serde(default)] pub text: String,
    #[serde(default)] pub delete_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportReplyForm {
    #[serde(default)] pub thread_id: String,
    #[serde(default)] pub reply_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteReplyForm {
    #[serde(default)] pub thread_id: String,
    #[serde(default)] pub reply_id: String,
    #[serde(default)] pub delete_password: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThreadQuery {
    #[serde(default)] pub thread_id: String,
}

#[utoipa::path(
    get,
    path = "/api/threads/{board}",
    tag = "threads",
    params(("board" = String, Path, description = "Board name")),
    responses(
        (status = 200, description = "Ten most recently bumped threads", body = [ThreadSummary]),
        (status = 404, description = "Unknown board")
    )
)]
pub async fn list_threads(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let threads = data.store.list_threads(&path.into_inner()).await?;
    let summaries: Vec<ThreadSummary> = threads.iter().map(project_thread_summary).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[utoipa::path(
    post,
    path = "/api/threads/{board}",
    tag = "threads",
    params(("board" = String, Path, description = "Board name")),
    request_body = NewThreadForm,
    responses(
        (status = 302, description = "Thread created; redirects to the board page"),
        (status = 400, description = "Missing text or delete_password"),
        (status = 404, description = "Unknown board")
    )
)]
pub async fn create_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Body<NewThreadForm>) -> Result<HttpResponse, ApiError> {
    let board = path.into_inner();
    let form = body(payload);
    data.store.create_thread(&board, &form.text, &form.delete_password).await?;
    Ok(HttpResponse::Found()
        .insert_header(("Location", format!("/b/{board}/")))
        .finish())
}

#[utoipa::path(
    put,
    path = "/api/threads/{board}",
    tag = "threads",
    params(("board" = String, Path, description = "Board name")),
    request_body = ReportThreadForm,
    responses(
        (status = 200, description = "Thread has been reported.", body = String),
        (status = 404, description = "Unknown board or thread")
    )
)]
pub async fn report_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Body<ReportThreadForm>) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    data.store.report_thread(&path.into_inner(), &form.report_id).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(THREAD_REPORTED))
}

#[utoipa::path(
    delete,
    path = "/api/threads/{board}",
    tag = "threads",
    params(("board" = String, Path, description = "Board name")),
    request_body = DeleteThreadForm,
    responses(
        (status = 200, description = "Delete successful.", body = String),
        (status = 403, description = "Incorrect password supplied for deletion."),
        (status = 404, description = "Unknown board or thread")
    )
)]
pub async fn delete_thread(data: web::Data<AppState>, path: web::Path<String>, payload: Body<DeleteThreadForm>) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    data.store.delete_thread(&path.into_inner(), &form.thread_id, &form.delete_password).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(DELETE_SUCCESSFUL))
}

#[utoipa::path(
    get,
    path = "/api/replies/{board}",
    tag = "replies",
    params(("board" = String, Path, description = "Board name"), ThreadQuery),
    responses(
        (status = 200, description = "Thread with every reply", body = ThreadDetail),
        (status = 404, description = "Unknown board or thread")
    )
)]
pub async fn get_thread(data: web::Data<AppState>, path: web::Path<String>, query: web::Query<ThreadQuery>) -> Result<HttpResponse, ApiError> {
    let thread = data.store.get_thread(&path.into_inner(), &query.thread_id).await?;
    Ok(HttpResponse::Ok().json(project_thread_detail(&thread)))
}

#[utoipa::path(
    post,
    path = "/api/replies/{board}",
    tag = "replies",
    params(("board" = String, Path, description = "Board name")),
    request_body = NewReplyForm,
    responses(
        (status = 302, description = "Reply created; redirects to the thread page"),
        (status = 400, description = "Missing text or delete_password"),
        (status = 404, description = "Unknown board or thread")
    )
)]
pub async fn create_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Body<NewReplyForm>) -> Result<HttpResponse, ApiError> {
    let board = path.into_inner();
    let form = body(payload);
    data.store.append_reply(&board, &form.thread_id, &form.text, &form.delete_password).await?;
    Ok(HttpResponse::Found()
        .insert_header(("Location", format!("/b/{board}/{}", form.thread_id.trim())))
        .finish())
}

#[utoipa::path(
    put,
    path = "/api/replies/{board}",
    tag = "replies",
    params(("board" = String, Path, description = "Board name")),
    request_body = ReportReplyForm,
    responses(
        (status = 200, description = "Reply has been reported.", body = String),
        (status = 404, description = "Unknown board, thread or reply")
    )
)]
pub async fn report_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Body<ReportReplyForm>) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    data.store.report_reply(&path.into_inner(), &form.thread_id, &form.reply_id).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(REPLY_REPORTED))
}

#[utoipa::path(
    delete,
    path = "/api/replies/{board}",
    tag = "replies",
    params(("board" = String, Path, description = "Board name")),
    request_body = DeleteReplyForm,
    responses(
        (status = 200, description = "Delete successful.", body = String),
        (status = 403, description = "Incorrect password supplied for deletion."),
        (status = 404, description = "Unknown board, thread or reply")
    )
)]
pub async fn delete_reply(data: web::Data<AppState>, path: web::Path<String>, payload: Body<DeleteReplyForm>) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    data.store.delete_reply(&path.into_inner(), &form.thread_id, &form.reply_id, &form.delete_password).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(DELETE_SUCCESSFUL))
}
