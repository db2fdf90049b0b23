mod map_value;
mod value;

pub use map_value::MapValue;
pub use value::FieldValue;
