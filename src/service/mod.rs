//! CrudService: the generic CRUD engine shared by every record type.

mod crud;
mod policy;
pub use crud::CrudService;
pub use policy::StoreFaultPolicy;
