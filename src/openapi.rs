use crate::projection::{ReplyView, ThreadDetail, ThreadSummary};
use crate::routes::{DeleteReplyForm, DeleteThreadForm, NewReplyForm, NewThreadForm, ReportReplyForm, ReportThreadForm};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_threads,
        crate::routes::create_thread,
        crate::routes::report_thread,
        crate::routes::delete_thread,
        crate::routes::get_thread,
        crate::routes::create_reply,
        crate::routes::report_reply,
        crate::routes::delete_reply,
    ),
    components(schemas(
        ThreadSummary, ThreadDetail, ReplyView,
        NewThreadForm, ReportThreadForm, DeleteThreadForm,
        NewReplyForm, ReportReplyForm, DeleteReplyForm,
    )),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "replies", description = "Reply operations"),
    )
)]
pub struct ApiDoc;
