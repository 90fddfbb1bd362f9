//! Hardware abstraction traits
//!
//! These traits define the seams between the control loop and the concrete
//! radio, button pad and feedback surface.

pub mod feedback;
pub mod input;
pub mod radio;

pub use feedback::{Feedback, NoFeedback};
pub use input::{InputError, InputSource};
pub use radio::{RadioConfig, RadioError, RadioTransport, RxInfo};
