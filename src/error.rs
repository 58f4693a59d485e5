/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use thiserror::Error;

/// Failures that abort an in-progress subtree build.
///
/// Only resource exhaustion is reported this way. Structural
/// impossibilities are bugs and are asserted in debug builds; incremental
/// incompatibility is not an error at all, it selects the reconstruction
/// path instead.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ConstructionError {
    #[error("box tree nesting exceeded {limit} levels")]
    DepthLimitExceeded { limit: usize },
    #[error("construction pass exceeded its budget of {limit} boxes")]
    BoxLimitExceeded { limit: usize },
}
