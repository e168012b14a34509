use std::fmt;

/// Scalar element types for tensor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Bool | DataType::I8 | DataType::U8 => 1,
            DataType::I16 | DataType::U16 | DataType::F16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F16 | DataType::F32 | DataType::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64
        ) || self.is_float()
    }

    /// The common supertype of two element types.
    ///
    /// Used when an operation combines operands of different types: floats
    /// win over integers, wider wins over narrower, and mixing signed with
    /// unsigned integers yields the signed type of the larger width.
    pub fn promote(self, other: DataType) -> DataType {
        if self == other {
            return self;
        }
        if self == DataType::Bool {
            return other;
        }
        if other == DataType::Bool {
            return self;
        }
        match (self.is_float(), other.is_float()) {
            (true, false) => self,
            (false, true) => other,
            (true, true) => {
                if self.size() >= other.size() {
                    self
                } else {
                    other
                }
            }
            (false, false) => {
                let size = self.size().max(other.size());
                if self.is_signed() || other.is_signed() {
                    match size {
                        1 => DataType::I8,
                        2 => DataType::I16,
                        4 => DataType::I32,
                        _ => DataType::I64,
                    }
                } else {
                    match size {
                        1 => DataType::U8,
                        2 => DataType::U16,
                        4 => DataType::U32,
                        _ => DataType::U64,
                    }
                }
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DataType::Bool => "bool",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::F16 => "f16",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}
