//! Main code generator module.
//!
//! Holds the [`Compiler`]: the inkwell context, module and builder, the
//! declared runtime entry points, a stack of storage scopes (names to stack
//! slots) and a stack of function frames. Also hosts the optimizer hook.

use std::collections::{HashMap, HashSet};

use inkwell::{
    basic_block::BasicBlock,
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    passes::PassManager,
    targets::TargetMachine,
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType},
    values::{BasicValueEnum, FunctionValue, PointerValue},
    AddressSpace,
};
use log::{debug, trace};

use crate::{
    ast::{
        ast::Program,
        expressions::{Expr, ExprKind},
        statements::{Stmt, StmtKind},
        types::Type,
    },
    errors::errors::CodegenError,
    type_checker::registry::TypeRegistry,
};

use super::{
    runtime::{declare_runtime_functions, Runtime},
    stmt::gen_statement,
};

/// Knobs for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name given to the generated module
    pub module_name: String,
    /// Run the optimization pipeline after generation
    pub optimize: bool,
    /// Run the IR verifier before handing the module out
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            module_name: String::from("gehu"),
            optimize: true,
            verify: true,
        }
    }
}

/// Where a name's value lives during generation.
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    pub slot: PointerValue<'a>,
    pub ty: Type,
    /// Function whose stack frame holds `slot`; `None` for module globals.
    pub owner: Option<FunctionValue<'a>>,
    /// The function this binding always holds. Set only for names that are
    /// never assigned to, and calls through it are direct.
    pub function: Option<FunctionValue<'a>>,
}

/// An outer local copied into a private global when a nested function is
/// created.
#[derive(Debug)]
struct Capture<'a> {
    name: String,
    global: PointerValue<'a>,
}

#[derive(Debug)]
struct Frame<'a> {
    function: FunctionValue<'a>,
    /// `None` for bodies that cannot `return`: top-level code and spawned
    /// statements.
    return_type: Option<Type>,
    /// First storage scope belonging to this frame.
    base_scope: usize,
    captures: Vec<Capture<'a>>,
}

pub struct Compiler<'a> {
    pub context: &'a Context,
    pub module: Module<'a>,
    pub builder: Builder<'a>,
    pub runtime: Runtime<'a>,

    scopes: Vec<HashMap<String, Binding<'a>>>,
    frames: Vec<Frame<'a>>,
    /// Names that appear on the left of an assignment anywhere in the program
    reassigned: HashSet<String>,
}

impl<'a> Compiler<'a> {
    /// Creates the module and declares every runtime entry point, including
    /// one conversion function per unit pair in `registry`.
    pub fn new(context: &'a Context, registry: &TypeRegistry, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        module.set_triple(&TargetMachine::get_default_triple());

        let runtime = declare_runtime_functions(context, &module, registry);

        Compiler {
            context,
            module,
            builder: context.create_builder(),
            runtime,
            scopes: vec![],
            frames: vec![],
            reassigned: HashSet::new(),
        }
    }

    /// Lowers top-level statements into `i32 main()`.
    pub fn gen_program(&mut self, program: &Program) -> Result<FunctionValue<'a>, CodegenError> {
        debug!("generating {} top-level statements", program.statements.len());

        for statement in program.statements.iter() {
            collect_assigned_stmt(statement, &mut self.reassigned);
        }

        let main_type = self.context.i32_type().fn_type(&[], false);
        let main = self.create_function("main", main_type, Linkage::External);

        let previous = self.begin_function(main, None);
        for statement in program.statements.iter() {
            gen_statement(self, statement)?;
        }
        self.end_function(previous)?;

        Ok(main)
    }

    /// Runs the IR verifier over the whole module.
    pub fn verify(&self) -> Result<(), CodegenError> {
        self.module
            .verify()
            .map_err(|message| CodegenError::Verification(message.to_string()))
    }

    /// Runs the per-function simplification pipeline: instruction combining,
    /// reassociation, GVN, then CFG simplification.
    pub fn run_passes(&self) {
        let fpm: PassManager<FunctionValue<'a>> = PassManager::create(&self.module);

        fpm.add_instruction_combining_pass();
        fpm.add_reassociate_pass();
        fpm.add_gvn_pass();
        fpm.add_cfg_simplification_pass();

        fpm.initialize();

        for function in self.module.get_functions() {
            if function.count_basic_blocks() > 0 {
                fpm.run_on(&function);
            }
        }

        fpm.finalize();
        debug!("optimization passes finished");
    }

    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Adds a function, or returns the existing one of that name.
    pub fn create_function(
        &self,
        name: &str,
        function_type: FunctionType<'a>,
        linkage: Linkage,
    ) -> FunctionValue<'a> {
        match self.module.get_function(name) {
            Some(function) => function,
            None => self.module.add_function(name, function_type, Some(linkage)),
        }
    }

    /// `hint` if no function has that name yet, otherwise `hint.N`.
    pub fn unique_function_name(&self, hint: &str) -> String {
        if self.module.get_function(hint).is_none() {
            return hint.to_string();
        }

        let mut counter = 1;
        loop {
            let name = format!("{}.{}", hint, counter);
            if self.module.get_function(&name).is_none() {
                return name;
            }
            counter += 1;
        }
    }

    /// Opens a body for `function`: a frame, a storage scope and an entry
    /// block. Returns the block to resume in once the body is closed.
    pub fn begin_function(
        &mut self,
        function: FunctionValue<'a>,
        return_type: Option<Type>,
    ) -> Option<BasicBlock<'a>> {
        let previous = self.builder.get_insert_block();

        self.frames.push(Frame {
            function,
            return_type,
            base_scope: self.scopes.len(),
            captures: vec![],
        });
        self.enter_scope();

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        previous
    }

    /// Closes the body opened by [`Compiler::begin_function`].
    ///
    /// A still-open last block returns the zero value of the function's
    /// return type. Captured outer locals are then written to their globals
    /// at the point where generation resumes.
    pub fn end_function(&mut self, previous: Option<BasicBlock<'a>>) -> Result<(), CodegenError> {
        let frame = self.frames.pop().ok_or_else(|| {
            CodegenError::Builder(String::from("no function body is open"))
        })?;

        if self.block_is_open() {
            match frame.function.get_type().get_return_type() {
                Some(return_type) => {
                    let zero = self.zero_value(return_type)?;
                    self.builder.build_return(Some(&zero))?;
                }
                None => {
                    self.builder.build_return(None)?;
                }
            }
        }

        self.scopes.truncate(frame.base_scope);

        if let Some(block) = previous {
            self.builder.position_at_end(block);
        }

        for capture in frame.captures {
            let source = self.resolve(&capture.name)?;
            let value = self.builder.build_load(source.slot, &capture.name)?;
            self.builder.build_store(capture.global, value)?;
        }

        Ok(())
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn bind(&mut self, name: &str, mut binding: Binding<'a>) {
        trace!("bind {}: {}", name, binding.ty);
        if self.reassigned.contains(name) {
            binding.function = None;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    /// Innermost binding of `name`, without capturing it.
    pub fn lookup(&self, name: &str) -> Option<&Binding<'a>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Finds the storage for `name`, as seen from the function being
    /// generated.
    ///
    /// A stack slot owned by an enclosing function cannot be reached from a
    /// nested one, so such a binding is captured: it gets a private global
    /// that the enclosing function fills when the nested one is created.
    pub fn resolve(&mut self, name: &str) -> Result<Binding<'a>, CodegenError> {
        let binding = self
            .lookup(name)
            .cloned()
            .ok_or_else(|| CodegenError::UnknownIdentifier {
                name: name.to_string(),
            })?;

        let current = self.current_function()?;
        match binding.owner {
            None => return Ok(binding),
            Some(owner) if owner == current => return Ok(binding),
            Some(_) => {}
        }

        let llvm_type = self.basic_type(&binding.ty);
        let global_name = format!("{}.{}", current.get_name().to_string_lossy(), name);
        let global = self.module.add_global(llvm_type, None, &global_name);
        global.set_linkage(Linkage::Private);
        global.set_initializer(&self.zero_value(llvm_type)?);

        let captured = Binding {
            slot: global.as_pointer_value(),
            owner: None,
            ..binding
        };

        let frame = self.frames.last_mut().ok_or_else(|| {
            CodegenError::Builder(String::from("no function body is open"))
        })?;
        frame.captures.push(Capture {
            name: name.to_string(),
            global: captured.slot,
        });
        let base_scope = frame.base_scope;
        self.scopes[base_scope].insert(name.to_string(), captured.clone());

        trace!("captured {} into {}", name, global_name);
        Ok(captured)
    }

    /// Return type of the function body being generated, `None` where
    /// `return` is not allowed.
    pub fn current_return_type(&self) -> Option<&Type> {
        self.frames.last().and_then(|frame| frame.return_type.as_ref())
    }

    pub fn current_function(&self) -> Result<FunctionValue<'a>, CodegenError> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| CodegenError::Builder(String::from("builder has no insertion block")))
    }

    pub fn append_block(&self, name: &str) -> Result<BasicBlock<'a>, CodegenError> {
        Ok(self.context.append_basic_block(self.current_function()?, name))
    }

    /// Whether the block being filled still lacks a terminator.
    pub fn block_is_open(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|block| block.get_terminator().is_none())
    }

    /// Branches to `target` unless the current block already ended.
    pub fn branch_if_open(&self, target: BasicBlock<'a>) -> Result<(), CodegenError> {
        if self.block_is_open() {
            self.builder.build_unconditional_branch(target)?;
        }
        Ok(())
    }

    /// Allocates a stack slot at the top of the current function's entry
    /// block, so slots declared in loops are not re-allocated per iteration.
    pub fn create_entry_alloca(
        &self,
        name: &str,
        ty: BasicTypeEnum<'a>,
    ) -> Result<PointerValue<'a>, CodegenError> {
        let function = self.current_function()?;
        let entry = function.get_first_basic_block().ok_or_else(|| {
            CodegenError::Builder(format!("function {:?} has no entry block", function.get_name()))
        })?;

        let builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => builder.position_before(&first),
            None => builder.position_at_end(entry),
        }

        Ok(builder.build_alloca(ty, name)?)
    }

    pub fn string_type(&self) -> BasicTypeEnum<'a> {
        self.context
            .i8_type()
            .ptr_type(AddressSpace::default())
            .into()
    }

    /// IR type of a value of semantic type `ty`. Units are erased.
    pub fn basic_type(&self, ty: &Type) -> BasicTypeEnum<'a> {
        match ty {
            Type::Number { .. } | Type::Unit(_) => self.context.f64_type().into(),
            Type::Boolean => self.context.bool_type().into(),
            Type::String => self.string_type(),
            Type::Function {
                params,
                return_type,
            } => self
                .function_type(params, return_type)
                .ptr_type(AddressSpace::default())
                .into(),
        }
    }

    pub fn function_type(&self, params: &[Type], return_type: &Type) -> FunctionType<'a> {
        let params: Vec<BasicMetadataTypeEnum<'a>> = params
            .iter()
            .map(|param| self.basic_type(param).into())
            .collect();

        self.basic_type(return_type).fn_type(&params, false)
    }

    pub fn zero_value(&self, ty: BasicTypeEnum<'a>) -> Result<BasicValueEnum<'a>, CodegenError> {
        match ty {
            BasicTypeEnum::FloatType(float) => Ok(float.const_zero().into()),
            BasicTypeEnum::IntType(int) => Ok(int.const_zero().into()),
            BasicTypeEnum::PointerType(pointer) => Ok(pointer.const_null().into()),
            other => Err(CodegenError::InvalidOperand {
                operation: String::from("zero value"),
                found: format!("{:?}", other),
            }),
        }
    }
}

fn collect_assigned_stmt(statement: &Stmt, names: &mut HashSet<String>) {
    match &statement.kind {
        StmtKind::Expression(expression)
        | StmtKind::Show(expression)
        | StmtKind::Wait(expression)
        | StmtKind::Return(Some(expression))
        | StmtKind::Let {
            initializer: expression,
            ..
        } => collect_assigned_expr(expression, names),
        StmtKind::Return(None) => {}
        StmtKind::Block(statements) => {
            for statement in statements.iter() {
                collect_assigned_stmt(statement, names);
            }
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_assigned_expr(condition, names);
            collect_assigned_stmt(then_branch, names);
            if let Some(else_branch) = else_branch {
                collect_assigned_stmt(else_branch, names);
            }
        }
        StmtKind::While { condition, body } => {
            collect_assigned_expr(condition, names);
            collect_assigned_stmt(body, names);
        }
        StmtKind::For {
            iterator,
            step,
            body,
            ..
        } => {
            collect_assigned_expr(iterator, names);
            if let Some(step) = step {
                collect_assigned_expr(step, names);
            }
            collect_assigned_stmt(body, names);
        }
        StmtKind::Match {
            scrutinee,
            cases,
            default,
        } => {
            collect_assigned_expr(scrutinee, names);
            for case in cases.iter() {
                collect_assigned_expr(&case.pattern, names);
                collect_assigned_stmt(&case.body, names);
            }
            if let Some(default) = default {
                collect_assigned_stmt(default, names);
            }
        }
        StmtKind::Spawn(body) => collect_assigned_stmt(body, names),
    }
}

fn collect_assigned_expr(expression: &Expr, names: &mut HashSet<String>) {
    match &expression.kind {
        ExprKind::Number { .. }
        | ExprKind::String(_)
        | ExprKind::Boolean(_)
        | ExprKind::Variable(_) => {}
        ExprKind::Assignment { name, value } => {
            names.insert(name.clone());
            collect_assigned_expr(value, names);
        }
        ExprKind::Binary { left, right, .. } => {
            collect_assigned_expr(left, names);
            collect_assigned_expr(right, names);
        }
        ExprKind::Unary { operand, .. } => collect_assigned_expr(operand, names),
        ExprKind::Call { callee, arguments } => {
            collect_assigned_expr(callee, names);
            for argument in arguments.iter() {
                collect_assigned_expr(argument, names);
            }
        }
        ExprKind::Pipeline { value, function } => {
            collect_assigned_expr(value, names);
            collect_assigned_expr(function, names);
        }
        ExprKind::Function(literal) => {
            for statement in literal.body.iter() {
                collect_assigned_stmt(statement, names);
            }
        }
    }
}

/// Lowers an analyzed program into a fresh module.
///
/// The module is verified (when `options.verify`) before any optimization
/// runs, so a failure always refers to the IR as generated.
pub fn compile<'a>(
    program: &Program,
    registry: &TypeRegistry,
    options: &CompileOptions,
    context: &'a Context,
) -> Result<Compiler<'a>, CodegenError> {
    let mut compiler = Compiler::new(context, registry, &options.module_name);

    compiler.gen_program(program)?;

    if options.verify {
        compiler.verify()?;
    }

    if options.optimize {
        compiler.run_passes();
    }

    debug!("generated module {}", options.module_name);
    Ok(compiler)
}
