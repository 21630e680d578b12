//! Brewing log backend: a generic CRUD engine over record stores, served as a REST API.

pub mod case;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod record;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use entity::{Brew, BrewResource};
pub use error::{AppError, ConfigError, StoreError};
pub use record::{Record, RecordId, RecordType};
pub use resource::CrudResource;
pub use response::{success_many, CrudResponse, Payload};
pub use routes::{app, brew_routes, common_routes, resource_routes};
pub use service::{CrudService, StoreFaultPolicy};
pub use settings::{Settings, StoreBackend};
pub use sql::{bind_parameters, BoundQuery, NamedQuery, Parameters};
pub use state::AppState;
pub use store::{MemoryDatabase, PgProvider, RecordStore, StoreProvider};
