pub mod batagelj_zaversnik;

pub use batagelj_zaversnik::KCore;
