// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::value::{RecordId, Value};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Self {
                Value::Number(value.0 as f64)
            }
        }

        impl From<$name> for RecordId {
            fn from(value: $name) -> Self {
                RecordId::Int(value.0)
            }
        }
    };
}

entity_id!(AccountId);
entity_id!(ContactId);
entity_id!(DealId);
entity_id!(ActivityId);
entity_id!(ActivityTypeId);
entity_id!(UserId);
entity_id!(NoteId);
entity_id!(AttachmentId);
