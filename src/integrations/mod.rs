//! External service integrations.

pub mod domain_probe {
    pub use crate::domain_probe::*;
}

pub mod place_details {
    pub use crate::place_details::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}
