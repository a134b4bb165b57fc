/*! Integration tests for thingsearch.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - value: Tests for document values and size estimation
 * - policy: Tests for policy evaluation and permission trees
 * - mapper: Tests for mapping Things to index documents
 * - diff: Tests for document diffs and compiled updates, applied back to documents
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("thingsearch=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod value;
