//! File format I/O: the CSM mesh format, Wavefront OBJ output, and
//! plain text point lists.

pub mod csm;
pub mod obj;
pub mod points;

pub use csm::{load_csm, save_csm};
pub use obj::{write_mtl, write_obj, write_obj_poly};
pub use points::{read_points, write_points};
