// Generic repository layer over SeaORM: parameterized CRUD, pagination,
// filtering, and named-association management for arbitrary entities.

pub mod association;
pub mod error;
pub mod filter;
pub mod paginator;
pub mod repository;

pub use association::{AssociatedEntity, Association, AssociationOps};
pub use error::{RepoError, RepoResult};
pub use filter::{OrderBy, Where};
pub use paginator::Paginator;
pub use repository::{BaseRepository, PrimaryKeyScalar};
