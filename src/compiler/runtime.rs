//! Runtime entry points the generated code links against.
//!
//! Only declarations live here; the bodies come from the host runtime. The
//! unit conversion functions are named `convert_{from}_to_{to}`, one per
//! conversion registered in the [`TypeRegistry`].

use inkwell::{
    context::Context,
    module::{Linkage, Module},
    values::FunctionValue,
    AddressSpace,
};
use log::trace;

use crate::type_checker::registry::TypeRegistry;

#[derive(Debug, Clone, Copy)]
pub struct Runtime<'a> {
    /// `void print(double)`
    pub print: FunctionValue<'a>,
    /// `void print_string(i8*)`
    pub print_string: FunctionValue<'a>,
    /// `i32 strcmp(i8*, i8*)`
    pub strcmp: FunctionValue<'a>,
    /// `i8* spawn_thread(i8*)`, takes a `void()` function pointer
    pub spawn_thread: FunctionValue<'a>,
    /// `void wait_thread(i8*)`
    pub wait_thread: FunctionValue<'a>,
}

/// Symbol name of the function converting a value in unit `from` to unit
/// `to`. The empty unit is the plain number.
pub fn conversion_name(from: &str, to: &str) -> String {
    format!("convert_{}_to_{}", from, to)
}

/// Declares every runtime function in `module`.
pub fn declare_runtime_functions<'a>(
    context: &'a Context,
    module: &Module<'a>,
    registry: &TypeRegistry,
) -> Runtime<'a> {
    let f64_type = context.f64_type();
    let i8_ptr_type = context.i8_type().ptr_type(AddressSpace::default());
    let void_type = context.void_type();

    let print = module.add_function(
        "print",
        void_type.fn_type(&[f64_type.into()], false),
        Some(Linkage::External),
    );

    let print_string = module.add_function(
        "print_string",
        void_type.fn_type(&[i8_ptr_type.into()], false),
        Some(Linkage::External),
    );

    // i32 strcmp(i8* lhs, i8* rhs)
    let strcmp = module.add_function(
        "strcmp",
        context
            .i32_type()
            .fn_type(&[i8_ptr_type.into(), i8_ptr_type.into()], false),
        Some(Linkage::External),
    );

    let spawn_thread = module.add_function(
        "spawn_thread",
        i8_ptr_type.fn_type(&[i8_ptr_type.into()], false),
        Some(Linkage::External),
    );

    let wait_thread = module.add_function(
        "wait_thread",
        void_type.fn_type(&[i8_ptr_type.into()], false),
        Some(Linkage::External),
    );

    let conversion_type = f64_type.fn_type(&[f64_type.into()], false);
    for (from, to, factor) in registry.conversions() {
        let name = conversion_name(from, to);
        trace!("declaring {} (factor {})", name, factor);
        module.add_function(&name, conversion_type, Some(Linkage::External));
    }

    Runtime {
        print,
        print_string,
        strcmp,
        spawn_thread,
        wait_thread,
    }
}
