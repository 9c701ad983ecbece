pub mod body_limit;
pub mod request_id;

pub use body_limit::reject_oversized_body;
pub use request_id::{request_id_middleware, RequestId};
