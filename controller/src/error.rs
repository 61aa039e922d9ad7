// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use thiserror::Error as DError;

#[derive(Debug, Clone, DError)]
pub enum ErrorKind {
    #[error("{0}:{1}: expected at least {2} fields")]
    MissingFields(String, u64, usize),

    #[error("{0}:{1}: couldn't parse {2} from '{3}'")]
    InvalidField(String, u64, &'static str, String),
}
