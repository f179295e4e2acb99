pub mod frame;
pub mod parser;
pub mod typewriter;

pub use frame::FrameSplitter;
pub use parser::{ parse_frame, parse_payload };
pub use typewriter::TypewriterBuffer;
