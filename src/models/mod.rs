pub mod cliente;
pub mod deuda;
pub mod pago;
pub mod renegociacion;
pub mod usuario;

pub use cliente::*;
pub use deuda::*;
pub use pago::*;
pub use renegociacion::*;
pub use usuario::*;
