pub mod model_loaders;

pub use model_loaders::{load_ticket_middleware, load_user_middleware};
