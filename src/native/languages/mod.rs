pub mod gnu;
pub mod java;
pub mod python;

use std::sync::Arc;

use crate::config::Toolchain;
use crate::core::registry::LanguageRegistry;

use self::{gnu::GnuStrategy, java::JavaStrategy, python::PythonStrategy};

/// Registry with every natively supported language wired to `toolchain`.
pub fn native_registry(toolchain: &Toolchain) -> LanguageRegistry {
    let mut registry = LanguageRegistry::new();
    registry
        .register(Arc::new(GnuStrategy::cpp(&toolchain.gpp)))
        .register(Arc::new(GnuStrategy::c(&toolchain.gcc)))
        .register(Arc::new(PythonStrategy::new(&toolchain.python)))
        .register(Arc::new(JavaStrategy::new(&toolchain.javac, &toolchain.java)));
    registry
}
