//! Lowering of analyzed IR into the module image.
//!
//! One method per function. The generator walks the finished tree and
//! keeps a shadow stack of operand types mirroring the target machine's
//! evaluation stack; the shadow stack decides which width/signedness
//! variant of an instruction to emit and when to insert an indirection
//! load before a member access. Arithmetic above the native width lowers
//! to calls into the runtime's wide-integer support routines.

use log::debug;
use num_bigint::BigInt;
use vesper_ast::{BinaryOp, CompareOp, LogicalOp, UnaryOp};

use super::emit::{Emitter, JumpLabel};
use super::image::{Constant, ConstantPool, ImageField, ImageLocal, ImageMethod, ImageType, ModuleImage};
use super::opcode::OpCode;
use crate::ir::{Block, Expr, ExprKind, SolvedRef, Stmt};
use crate::resolve;
use crate::sema::param_types;
use crate::session::CompileSession;
use crate::symbol::{SymbolId, SymbolKind};
use crate::types::{StringEncoding, TypeRef};

/// Lower every struct and module into the image.
pub fn run(session: &CompileSession) -> ModuleImage {
    let mut constants = ConstantPool::new();
    let mut types = Vec::new();

    for (id, symbol) in session.arena.iter() {
        match &symbol.kind {
            SymbolKind::Struct(_) => types.push(struct_type(session, &mut constants, id)),
            SymbolKind::Module => types.push(holder_type(session, &mut constants, id)),
            _ => {}
        }
    }

    debug!("generated {} image types", types.len());
    ModuleImage { types, constants }
}

/// Mangled method name: dotted path plus the parameter signature, so
/// overloads stay distinct call targets.
pub fn mangled_name(session: &CompileSession, function: SymbolId) -> String {
    let params: Vec<_> = param_types(session, function)
        .iter()
        .map(|t| t.display(&session.arena))
        .collect();
    format!("{}({})", session.symbol(function).path, params.join(","))
}

/// Sequential field slot: fields of the base chain come first.
fn field_slot(session: &CompileSession, field: SymbolId) -> u16 {
    let index = match &session.symbol(field).kind {
        SymbolKind::Field(data) => data.index,
        _ => 0,
    };
    let offset = session
        .symbol(field)
        .parent
        .map(|owner| base_field_count(session, owner))
        .unwrap_or(0);
    (offset + index) as u16
}

fn base_field_count(session: &CompileSession, struct_id: SymbolId) -> u32 {
    let mut count = 0;
    let mut cursor = resolve::base_of(session, struct_id);
    while let Some(current) = cursor {
        if let SymbolKind::Struct(data) = &session.symbol(current).kind {
            count += data.fields.len() as u32;
        }
        cursor = resolve::base_of(session, current);
    }
    count
}

fn struct_type(session: &CompileSession, constants: &mut ConstantPool, id: SymbolId) -> ImageType {
    let symbol = session.symbol(id);
    let SymbolKind::Struct(data) = &symbol.kind else {
        return ImageType::default();
    };
    let base = match &data.extends {
        Some(TypeRef::Struct(base)) => Some(session.symbol(*base).path.to_string()),
        _ => None,
    };
    let fields = data
        .fields
        .iter()
        .map(|&f| image_field(session, f))
        .collect();
    let methods = symbol
        .children
        .iter()
        .copied()
        .filter(|&c| matches!(session.symbol(c).kind, SymbolKind::Function(_)))
        .map(|f| compile_method(session, constants, f, Some(id)))
        .collect();
    ImageType {
        name: symbol.path.to_string(),
        holder: false,
        base,
        fields,
        methods,
    }
}

/// The synthetic static holder type of a module: every namespace-level
/// field and function beneath the module lives here.
fn holder_type(session: &CompileSession, constants: &mut ConstantPool, id: SymbolId) -> ImageType {
    let mut fields = Vec::new();
    let mut functions = Vec::new();
    collect_holder_members(session, id, &mut fields, &mut functions);
    ImageType {
        name: session.symbol(id).path.to_string(),
        holder: true,
        base: None,
        fields: fields
            .into_iter()
            .map(|f| image_field(session, f))
            .collect(),
        methods: functions
            .into_iter()
            .map(|f| compile_method(session, constants, f, None))
            .collect(),
    }
}

fn collect_holder_members(
    session: &CompileSession,
    scope: SymbolId,
    fields: &mut Vec<SymbolId>,
    functions: &mut Vec<SymbolId>,
) {
    for &child in &session.symbol(scope).children {
        match &session.symbol(child).kind {
            SymbolKind::Field(_) => fields.push(child),
            SymbolKind::Function(_) => functions.push(child),
            SymbolKind::Namespace => {
                collect_holder_members(session, child, fields, functions);
            }
            _ => {}
        }
    }
}

fn image_field(session: &CompileSession, field: SymbolId) -> ImageField {
    let symbol = session.symbol(field);
    let (ty, initial) = match &symbol.kind {
        SymbolKind::Field(data) => {
            let initial = data.init.as_ref().and_then(|init| match &init.kind {
                ExprKind::Int(v) => Some(literal_constant(v, &data.ty)),
                ExprKind::Str(s) => Some(Constant::Str {
                    bytes: s.clone().into_bytes(),
                    encoding: StringEncoding::Utf8,
                }),
                ExprKind::Bool(b) => Some(Constant::Int(i64::from(*b))),
                _ => None,
            });
            (data.ty.display(&session.arena), initial)
        }
        _ => (String::new(), None),
    };
    ImageField {
        name: symbol.name.clone(),
        ty,
        is_static: symbol.is_static(),
        initial,
    }
}

fn literal_constant(value: &BigInt, ty: &TypeRef) -> Constant {
    use num_traits::ToPrimitive;
    match ty {
        TypeRef::Int { signed: false, width } if width.bits() > 64 => {
            Constant::Wide(value.to_u128().unwrap_or_default().to_le_bytes())
        }
        TypeRef::Int { signed: true, width } if width.bits() > 64 => {
            Constant::Wide(value.to_i128().unwrap_or_default().to_le_bytes())
        }
        TypeRef::Int { signed: false, .. } => Constant::Uint(value.to_u64().unwrap_or_default()),
        _ => Constant::Int(value.to_i64().unwrap_or_default()),
    }
}

fn compile_method(
    session: &CompileSession,
    constants: &mut ConstantPool,
    function: SymbolId,
    owner_struct: Option<SymbolId>,
) -> ImageMethod {
    let symbol = session.symbol(function);
    let SymbolKind::Function(data) = &symbol.kind else {
        return ImageMethod {
            name: String::new(),
            export_name: None,
            param_count: 0,
            locals: Vec::new(),
            is_static: true,
            vslot: None,
            chunk: Default::default(),
        };
    };

    let locals = data
        .locals
        .iter()
        .map(|&l| {
            let local = session.symbol(l);
            let ty = match &local.kind {
                SymbolKind::Local(data) => data.ty.display(&session.arena),
                _ => String::new(),
            };
            ImageLocal {
                name: local.name.clone(),
                ty,
            }
        })
        .collect();

    let vslot = owner_struct.and_then(|s| match &session.symbol(s).kind {
        SymbolKind::Struct(sd) => sd
            .vtable
            .iter()
            .position(|slot| slot.declared == function || slot.overridden == Some(function))
            .map(|i| i as u16),
        _ => None,
    });

    let mut generator = FunctionGen {
        session,
        em: Emitter::new(constants),
        stack: Vec::new(),
        this_struct: owner_struct,
    };
    if let Some(body) = &data.body {
        generator.gen_block(body);
    }
    // Every code path must end in an explicit return.
    let last_is_return = generator.em.last_op().is_some_and(OpCode::is_return);
    if !last_is_return && matches!(data.return_type, TypeRef::Void) {
        generator.em.emit(OpCode::RetVoid);
    }

    ImageMethod {
        name: mangled_name(session, function),
        export_name: symbol.export_name.clone(),
        param_count: data.params.len() as u16,
        locals,
        is_static: symbol.is_static(),
        vslot,
        chunk: generator.em.finish(),
    }
}

/// Operand families the instruction set distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    I32,
    U32,
    I64,
    U64,
    WideSigned,
    WideUnsigned,
    Bool,
    Str,
    Other,
}

impl Family {
    fn signed(self) -> bool {
        matches!(self, Family::I32 | Family::I64 | Family::WideSigned)
    }
}

struct FunctionGen<'a, 'pool> {
    session: &'a CompileSession,
    em: Emitter<'pool>,
    /// Shadow of the target machine's evaluation stack.
    stack: Vec<TypeRef>,
    /// The struct whose instance `this` designates, for instance methods.
    this_struct: Option<SymbolId>,
}

impl FunctionGen<'_, '_> {
    fn family_of(&self, ty: &TypeRef) -> Family {
        match ty {
            TypeRef::Bool => Family::Bool,
            TypeRef::Char => Family::U32,
            TypeRef::Str(_) => Family::Str,
            TypeRef::ComptimeInt => Family::I32,
            TypeRef::Int { signed, width } => match (width.bits(), signed) {
                (0..=32, true) => Family::I32,
                (0..=32, false) => Family::U32,
                (33..=64, true) => Family::I64,
                (33..=64, false) => Family::U64,
                (_, true) => Family::WideSigned,
                (_, false) => Family::WideUnsigned,
            },
            TypeRef::Typedef(id) => match &self.session.symbol(*id).kind {
                SymbolKind::Typedef(data) => self.family_of(&data.underlying),
                _ => Family::Other,
            },
            _ => Family::Other,
        }
    }

    fn push(&mut self, ty: TypeRef) {
        self.stack.push(ty);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn pop_n(&mut self, n: usize) {
        for _ in 0..n {
            self.stack.pop();
        }
    }

    /// Insert an indirection load when the value on the stack is a
    /// reference but the next member access expects the instance itself.
    fn deref_for_member(&mut self) {
        if let Some(TypeRef::Reference(inner)) = self.stack.last().cloned() {
            self.em.emit(OpCode::LoadIndirect);
            self.pop();
            self.push(*inner);
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn gen_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.gen_expr(expr);
                if !matches!(expr.ty, TypeRef::Void | TypeRef::NoReturn) {
                    self.em.emit(OpCode::Pop);
                    self.pop();
                }
            }
            Stmt::Return { value, .. } => match value {
                Some(expr) => {
                    self.gen_expr(expr);
                    self.em.emit(OpCode::Ret);
                    self.pop();
                }
                None => self.em.emit(OpCode::RetVoid),
            },
            Stmt::Assign { target, value, .. } => self.gen_assign(target, value),
            Stmt::If { arms, else_body } => self.gen_if(arms, else_body.as_ref()),
            Stmt::While {
                define,
                condition,
                step,
                body,
            } => self.gen_while(define.as_ref(), condition, step.as_ref(), body),
            Stmt::Block(block) => self.gen_block(block),
        }
    }

    /// `if`/`elif`/`else`: a cascade of condition tests, each branching
    /// past its own body to one shared end label.
    fn gen_if(&mut self, arms: &[crate::ir::IfArm], else_body: Option<&Block>) {
        let mut end_jumps: Vec<JumpLabel> = Vec::new();
        for arm in arms {
            let false_jumps = self.gen_condition(&arm.condition);
            self.gen_block(&arm.body);
            end_jumps.push(self.em.emit_jump(OpCode::Jump));
            for label in false_jumps {
                self.em.patch(label);
            }
        }
        if let Some(else_body) = else_body {
            self.gen_block(else_body);
        }
        for label in end_jumps {
            self.em.patch(label);
        }
    }

    /// `while` lowers do-style: an unconditional jump to a trailing
    /// condition test, then the body label. The condition evaluates once
    /// per iteration at the bottom, jumping back to the body while true.
    fn gen_while(
        &mut self,
        define: Option<&Block>,
        condition: &Expr,
        step: Option<&Block>,
        body: &Block,
    ) {
        if let Some(define) = define {
            self.gen_block(define);
        }
        let to_condition = self.em.emit_jump(OpCode::Jump);
        let body_mark = self.em.mark();
        self.gen_block(body);
        if let Some(step) = step {
            self.gen_block(step);
        }
        self.em.patch(to_condition);
        let exits = self.gen_loop_condition(condition, body_mark);
        for label in exits {
            self.em.patch(label);
        }
    }

    /// Lower a forward branch condition. Falls through when the condition
    /// is true; the returned labels jump when it is false. Logical
    /// operands become nested conditional branches, never a materialized
    /// boolean.
    fn gen_condition(&mut self, condition: &Expr) -> Vec<JumpLabel> {
        match &condition.kind {
            ExprKind::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                let mut labels = self.gen_condition(left);
                labels.extend(self.gen_condition(right));
                labels
            }
            ExprKind::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                self.gen_expr(left);
                let when_true = self.em.emit_jump(OpCode::JumpIfTrue);
                self.pop();
                let labels = self.gen_condition(right);
                self.em.patch(when_true);
                labels
            }
            _ => {
                self.gen_expr(condition);
                self.pop();
                vec![self.em.emit_jump(OpCode::JumpIfFalse)]
            }
        }
    }

    /// Lower a bottom-of-loop condition jumping back to `body_mark` while
    /// true. The returned labels exit the loop when it is false.
    fn gen_loop_condition(&mut self, condition: &Expr, body_mark: usize) -> Vec<JumpLabel> {
        match &condition.kind {
            ExprKind::Logical {
                op: LogicalOp::And,
                left,
                right,
            } => {
                self.gen_expr(left);
                self.pop();
                let exit = self.em.emit_jump(OpCode::JumpIfFalse);
                let mut labels = self.gen_loop_condition(right, body_mark);
                labels.push(exit);
                labels
            }
            ExprKind::Logical {
                op: LogicalOp::Or,
                left,
                right,
            } => {
                self.gen_expr(left);
                self.pop();
                self.em.emit_back_jump(OpCode::LoopIfTrue, body_mark);
                self.gen_loop_condition(right, body_mark)
            }
            _ => {
                self.gen_expr(condition);
                self.pop();
                self.em.emit_back_jump(OpCode::LoopIfTrue, body_mark);
                Vec::new()
            }
        }
    }

    fn gen_assign(&mut self, target: &Expr, value: &Expr) {
        match &target.kind {
            ExprKind::Solved(SolvedRef::Local(local)) => {
                self.gen_expr(value);
                self.em.emit_u16(OpCode::StoreLocal, self.local_slot(*local));
                self.pop();
            }
            ExprKind::Solved(SolvedRef::Parameter(param)) => {
                self.gen_expr(value);
                self.em.emit_u16(OpCode::StoreArg, self.param_slot(*param));
                self.pop();
            }
            ExprKind::Solved(SolvedRef::Field(field)) => {
                if self.session.symbol(*field).is_static() {
                    self.gen_expr(value);
                    let name = self.session.symbol(*field).path.to_string();
                    let at = self.em.name_index(&name);
                    self.em.emit_u16(OpCode::StoreStatic, at);
                    self.pop();
                } else {
                    self.em.emit(OpCode::LoadThis);
                    self.gen_expr(value);
                    self.em
                        .emit_u16(OpCode::StoreField, field_slot(self.session, *field));
                    self.pop();
                }
            }
            ExprKind::FieldAccess { base, field } => {
                self.gen_expr(base);
                self.deref_for_member();
                self.gen_expr(value);
                self.em
                    .emit_u16(OpCode::StoreField, field_slot(self.session, *field));
                self.pop_n(2);
            }
            ExprKind::Index { base, index } => {
                self.gen_expr(base);
                self.gen_expr(index);
                self.gen_expr(value);
                self.em.emit(OpCode::StoreElem);
                self.pop_n(3);
            }
            _ => {}
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn gen_expr(&mut self, expr: &Expr) {
        self.em.set_line(expr.span.line);
        match &expr.kind {
            ExprKind::Int(value) => {
                let family = self.family_of(&expr.ty);
                match family {
                    Family::WideSigned | Family::WideUnsigned => {
                        self.em.emit_wide(value, family.signed());
                    }
                    _ => self.em.emit_int(value, family.signed()),
                }
                self.push(expr.ty.clone());
            }
            ExprKind::Str(s) => {
                let encoding = match &expr.ty {
                    TypeRef::Str(encoding) => *encoding,
                    _ => StringEncoding::Utf8,
                };
                let bytes = match encoding {
                    StringEncoding::Utf8 => s.clone().into_bytes(),
                    StringEncoding::Utf16 => {
                        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
                    }
                };
                self.em.emit_constant(Constant::Str { bytes, encoding });
                self.push(expr.ty.clone());
            }
            ExprKind::Bool(b) => {
                self.em
                    .emit(if *b { OpCode::PushTrue } else { OpCode::PushFalse });
                self.push(TypeRef::Bool);
            }
            ExprKind::Null => {
                self.em.emit(OpCode::PushNull);
                self.push(expr.ty.clone());
            }
            ExprKind::Collection(items) => {
                for item in items {
                    self.gen_expr(item);
                }
                self.em.emit_u16(OpCode::NewSlice, items.len() as u16);
                self.pop_n(items.len());
                self.push(expr.ty.clone());
            }
            ExprKind::Solved(solved) => self.gen_reference(*solved, &expr.ty),
            ExprKind::FieldAccess { base, field } => {
                self.gen_expr(base);
                self.deref_for_member();
                self.em
                    .emit_u16(OpCode::LoadField, field_slot(self.session, *field));
                self.pop();
                self.push(expr.ty.clone());
            }
            ExprKind::Call {
                function,
                receiver,
                args,
                vslot,
            } => self.gen_call(*function, receiver.as_deref(), args, *vslot, &expr.ty),
            ExprKind::ConstructInto {
                target,
                ctor,
                args,
            } => {
                self.gen_address(target);
                for arg in args {
                    self.gen_expr(arg);
                }
                // The target address is the constructor's implicit first
                // argument.
                let name = mangled_name(self.session, *ctor);
                self.em.emit_call(&name, args.len() as u8 + 1);
                self.pop_n(args.len() + 1);
            }
            ExprKind::Conv { value, to } => {
                self.gen_expr(value);
                self.gen_conversion(&value.ty, to);
            }
            ExprKind::Unary { op, value } => {
                self.gen_expr(value);
                self.gen_unary(*op, &value.ty);
                self.pop();
                self.push(expr.ty.clone());
            }
            ExprKind::Binary { op, left, right } => {
                self.gen_expr(left);
                self.gen_expr(right);
                self.gen_binary(*op, &expr.ty);
                self.pop_n(2);
                self.push(expr.ty.clone());
            }
            ExprKind::Compare { op, left, right } => {
                self.gen_expr(left);
                self.gen_expr(right);
                self.gen_compare(*op, &left.ty);
                self.pop_n(2);
                self.push(TypeRef::Bool);
            }
            ExprKind::Logical { op, left, right } => {
                // In value position the short-circuit still runs as
                // branches; only the final boolean materializes.
                self.gen_expr(left);
                self.pop();
                match op {
                    LogicalOp::And => {
                        let when_false = self.em.emit_jump(OpCode::JumpIfFalse);
                        self.gen_expr(right);
                        self.pop();
                        let done = self.em.emit_jump(OpCode::Jump);
                        self.em.patch(when_false);
                        self.em.emit(OpCode::PushFalse);
                        self.em.patch(done);
                    }
                    LogicalOp::Or => {
                        let when_true = self.em.emit_jump(OpCode::JumpIfTrue);
                        self.gen_expr(right);
                        self.pop();
                        let done = self.em.emit_jump(OpCode::Jump);
                        self.em.patch(when_true);
                        self.em.emit(OpCode::PushTrue);
                        self.em.patch(done);
                    }
                }
                self.push(TypeRef::Bool);
            }
            ExprKind::Index { base, index } => {
                self.gen_expr(base);
                self.gen_expr(index);
                self.em.emit(OpCode::LoadElem);
                self.pop_n(2);
                self.push(expr.ty.clone());
            }
            ExprKind::LengthOf(value) => {
                self.gen_expr(value);
                self.em.emit(OpCode::SliceLen);
                self.pop();
                self.push(expr.ty.clone());
            }
            // These forms never survive semantic analysis.
            ExprKind::Unsolved(_)
            | ExprKind::Access { .. }
            | ExprKind::Invoke { .. }
            | ExprKind::New { .. } => {
                self.push(expr.ty.clone());
            }
        }
    }

    fn gen_reference(&mut self, solved: SolvedRef, ty: &TypeRef) {
        match solved {
            SolvedRef::Local(local) => {
                self.em.emit_u16(OpCode::LoadLocal, self.local_slot(local));
                self.push(ty.clone());
            }
            SolvedRef::Parameter(param) => {
                self.em.emit_u16(OpCode::LoadArg, self.param_slot(param));
                self.push(ty.clone());
            }
            SolvedRef::Field(field) => {
                if self.session.symbol(field).is_static() {
                    let name = self.session.symbol(field).path.to_string();
                    let at = self.em.name_index(&name);
                    self.em.emit_u16(OpCode::LoadStatic, at);
                    self.push(ty.clone());
                } else {
                    self.em.emit(OpCode::LoadThis);
                    let this = self.this_type();
                    self.push(this);
                    self.deref_for_member();
                    self.em
                        .emit_u16(OpCode::LoadField, field_slot(self.session, field));
                    self.pop();
                    self.push(ty.clone());
                }
            }
            SolvedRef::TypedefItem(item) => {
                let value = match &self.session.symbol(item).kind {
                    SymbolKind::TypedefItem(data) => data.value.clone().unwrap_or_default(),
                    _ => BigInt::ZERO,
                };
                let signed = self.family_of(ty).signed();
                self.em.emit_int(&value, signed);
                self.push(ty.clone());
            }
            // Scope references produce no value; they only appear as
            // intermediate access bases.
            _ => self.push(ty.clone()),
        }
    }

    fn gen_call(
        &mut self,
        function: SymbolId,
        receiver: Option<&Expr>,
        args: &[Expr],
        vslot: Option<u16>,
        result: &TypeRef,
    ) {
        let callee = self.session.symbol(function);
        let is_instance = !callee.is_static()
            && callee
                .parent
                .is_some_and(|p| matches!(self.session.symbol(p).kind, SymbolKind::Struct(_)));
        let mut popped = args.len();
        if is_instance {
            match receiver {
                Some(receiver) => self.gen_expr(receiver),
                None => {
                    self.em.emit(OpCode::LoadThis);
                    let this = self.this_type();
                    self.push(this);
                }
            }
            popped += 1;
        }
        for arg in args {
            self.gen_expr(arg);
        }

        let dispatch_virtually = vslot.is_some()
            && (callee.is_virtual_member()
                || callee
                    .modifiers
                    .contains(crate::symbol::Modifiers::OVERRIDE));
        match (dispatch_virtually, vslot) {
            (true, Some(slot)) => self.em.emit_call_virtual(slot, args.len() as u8),
            _ => {
                let name = mangled_name(self.session, function);
                self.em.emit_call(&name, args.len() as u8);
            }
        }

        self.pop_n(popped);
        if !matches!(result, TypeRef::Void | TypeRef::NoReturn) {
            self.push(result.clone());
        }
    }

    /// Push the address of an assignable place.
    fn gen_address(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Solved(SolvedRef::Local(local)) => {
                self.em.emit_u16(OpCode::AddrLocal, self.local_slot(*local));
            }
            ExprKind::Solved(SolvedRef::Field(field)) => {
                if self.session.symbol(*field).is_static() {
                    let name = self.session.symbol(*field).path.to_string();
                    let at = self.em.name_index(&name);
                    self.em.emit_u16(OpCode::AddrStatic, at);
                } else {
                    self.em.emit(OpCode::LoadThis);
                    self.em
                        .emit_u16(OpCode::AddrField, field_slot(self.session, *field));
                }
            }
            ExprKind::FieldAccess { base, field } => {
                self.gen_expr(base);
                self.deref_for_member();
                self.pop();
                self.em
                    .emit_u16(OpCode::AddrField, field_slot(self.session, *field));
            }
            _ => {}
        }
        self.push(TypeRef::Reference(Box::new(target.ty.clone())));
    }

    // ==========================================================================
    // Operators and conversions
    // ==========================================================================

    fn gen_unary(&mut self, op: UnaryOp, operand: &TypeRef) {
        let family = self.family_of(operand);
        match (op, family) {
            (UnaryOp::Not, _) => self.em.emit(OpCode::NotBool),
            (UnaryOp::Neg, Family::WideSigned | Family::WideUnsigned) => {
                self.em.emit_call("rt.i128.neg", 1);
            }
            (UnaryOp::Neg, Family::I64 | Family::U64) => self.em.emit(OpCode::NegI64),
            (UnaryOp::Neg, _) => self.em.emit(OpCode::NegI32),
            (UnaryOp::BitNot, Family::WideSigned | Family::WideUnsigned) => {
                self.em.emit_call("rt.i128.not", 1);
            }
            (UnaryOp::BitNot, Family::I32) => self.em.emit(OpCode::NotI32),
            (UnaryOp::BitNot, Family::U32) => self.em.emit(OpCode::NotU32),
            (UnaryOp::BitNot, Family::I64) => self.em.emit(OpCode::NotI64),
            (UnaryOp::BitNot, _) => self.em.emit(OpCode::NotU64),
        }
    }

    fn gen_binary(&mut self, op: BinaryOp, result: &TypeRef) {
        let family = self.family_of(result);
        match family {
            Family::Str => self.em.emit(OpCode::ConcatStr),
            Family::WideSigned | Family::WideUnsigned => {
                self.em.emit_call(wide_binary_name(op, family.signed()), 2);
            }
            _ => {
                if let Some(opcode) = arith_op(op, family) {
                    self.em.emit(opcode);
                }
            }
        }
    }

    fn gen_compare(&mut self, op: CompareOp, operand: &TypeRef) {
        let family = self.family_of(operand);
        match family {
            Family::Str => self.em.emit(match op {
                CompareOp::Eq => OpCode::EqStr,
                _ => OpCode::NeStr,
            }),
            Family::WideSigned | Family::WideUnsigned => {
                // The support routine pushes -1/0/1; compare that against
                // zero at native width.
                let name = if family.signed() {
                    "rt.i128.cmp_s"
                } else {
                    "rt.i128.cmp_u"
                };
                self.em.emit_call(name, 2);
                self.em.emit(OpCode::PushZero);
                if let Some(opcode) = cmp_op(op, Family::I32) {
                    self.em.emit(opcode);
                }
            }
            Family::Bool => self.em.emit(match op {
                CompareOp::Eq => OpCode::EqI32,
                _ => OpCode::NeI32,
            }),
            _ => {
                if let Some(opcode) = cmp_op(op, family) {
                    self.em.emit(opcode);
                }
            }
        }
    }

    /// Emit the representation change for a conversion node. Conversions
    /// into or out of the wide width are calls into the support type.
    fn gen_conversion(&mut self, from: &TypeRef, to: &TypeRef) {
        let from_family = self.family_of(from);
        let to_family = self.family_of(to);
        let from_wide = matches!(from_family, Family::WideSigned | Family::WideUnsigned);
        let to_wide = matches!(to_family, Family::WideSigned | Family::WideUnsigned);

        match (from_wide, to_wide) {
            (false, true) => {
                if let (Some((fs, fb)), Some(_)) = (int_parts(from), int_parts(to)) {
                    // Widen to the native word first, then lift.
                    self.em.emit_byte(OpCode::Conv, int_code(fs, fb));
                    self.em.emit_raw_byte(int_code(fs, 64));
                    self.em
                        .emit_call(if fs { "rt.i128.from_s" } else { "rt.i128.from_u" }, 1);
                }
            }
            (true, false) => {
                if let Some((ts, tb)) = int_parts(to) {
                    self.em
                        .emit_call(if ts { "rt.i128.to_s" } else { "rt.i128.to_u" }, 1);
                    self.em.emit_byte(OpCode::Conv, int_code(ts, 64));
                    self.em.emit_raw_byte(int_code(ts, tb));
                }
            }
            (true, true) => {
                // Same representation; signedness is a view change.
            }
            (false, false) => {
                if let (Some((fs, fb)), Some((ts, tb))) = (int_parts(from), int_parts(to)) {
                    self.em.emit_byte(OpCode::Conv, int_code(fs, fb));
                    self.em.emit_raw_byte(int_code(ts, tb));
                }
                // Nullable lifts and reference upcasts keep their
                // representation; nothing to emit.
            }
        }
        self.pop();
        self.push(to.clone());
    }

    /// The type `this` has on the stack: a reference to the owning struct.
    fn this_type(&self) -> TypeRef {
        match self.this_struct {
            Some(id) => TypeRef::Reference(Box::new(TypeRef::Struct(id))),
            None => TypeRef::Reference(Box::new(TypeRef::Void)),
        }
    }

    fn local_slot(&self, local: SymbolId) -> u16 {
        match &self.session.symbol(local).kind {
            SymbolKind::Local(data) => data.slot as u16,
            _ => 0,
        }
    }

    fn param_slot(&self, param: SymbolId) -> u16 {
        match &self.session.symbol(param).kind {
            SymbolKind::Parameter(data) => data.slot as u16,
            _ => 0,
        }
    }
}

/// Side code of a narrow integer conversion: sign flag plus bit width.
fn int_code(signed: bool, bits: u16) -> u8 {
    let bits = bits.min(64) as u8;
    if signed { 0x80 | bits } else { bits }
}

fn int_parts(ty: &TypeRef) -> Option<(bool, u16)> {
    match ty {
        TypeRef::Int { signed, width } => Some((*signed, width.bits())),
        TypeRef::Bool => Some((false, 1)),
        TypeRef::Char => Some((false, 32)),
        _ => None,
    }
}

fn wide_binary_name(op: BinaryOp, signed: bool) -> &'static str {
    match op {
        BinaryOp::Add => "rt.i128.add",
        BinaryOp::Sub => "rt.i128.sub",
        BinaryOp::Mul => "rt.i128.mul",
        BinaryOp::Div => {
            if signed {
                "rt.i128.div_s"
            } else {
                "rt.i128.div_u"
            }
        }
        BinaryOp::Mod => {
            if signed {
                "rt.i128.rem_s"
            } else {
                "rt.i128.rem_u"
            }
        }
        BinaryOp::BitAnd => "rt.i128.and",
        BinaryOp::BitOr => "rt.i128.or",
        BinaryOp::BitXor => "rt.i128.xor",
        BinaryOp::Shl => "rt.i128.shl",
        BinaryOp::Shr => {
            if signed {
                "rt.i128.shr_s"
            } else {
                "rt.i128.shr_u"
            }
        }
    }
}

fn arith_op(op: BinaryOp, family: Family) -> Option<OpCode> {
    use BinaryOp::*;
    use OpCode::*;
    Some(match (family, op) {
        (Family::I32, Add) => AddI32,
        (Family::I32, Sub) => SubI32,
        (Family::I32, Mul) => MulI32,
        (Family::I32, Div) => DivI32,
        (Family::I32, Mod) => ModI32,
        (Family::I32, BitAnd) => AndI32,
        (Family::I32, BitOr) => OrI32,
        (Family::I32, BitXor) => XorI32,
        (Family::I32, Shl) => ShlI32,
        (Family::I32, Shr) => ShrI32,
        (Family::U32, Add) => AddU32,
        (Family::U32, Sub) => SubU32,
        (Family::U32, Mul) => MulU32,
        (Family::U32, Div) => DivU32,
        (Family::U32, Mod) => ModU32,
        (Family::U32, BitAnd) => AndU32,
        (Family::U32, BitOr) => OrU32,
        (Family::U32, BitXor) => XorU32,
        (Family::U32, Shl) => ShlU32,
        (Family::U32, Shr) => ShrU32,
        (Family::I64, Add) => AddI64,
        (Family::I64, Sub) => SubI64,
        (Family::I64, Mul) => MulI64,
        (Family::I64, Div) => DivI64,
        (Family::I64, Mod) => ModI64,
        (Family::I64, BitAnd) => AndI64,
        (Family::I64, BitOr) => OrI64,
        (Family::I64, BitXor) => XorI64,
        (Family::I64, Shl) => ShlI64,
        (Family::I64, Shr) => ShrI64,
        (Family::U64, Add) => AddU64,
        (Family::U64, Sub) => SubU64,
        (Family::U64, Mul) => MulU64,
        (Family::U64, Div) => DivU64,
        (Family::U64, Mod) => ModU64,
        (Family::U64, BitAnd) => AndU64,
        (Family::U64, BitOr) => OrU64,
        (Family::U64, BitXor) => XorU64,
        (Family::U64, Shl) => ShlU64,
        (Family::U64, Shr) => ShrU64,
        _ => return None,
    })
}


fn cmp_op(op: CompareOp, family: Family) -> Option<OpCode> {
    use CompareOp::*;
    use OpCode::*;
    Some(match (family, op) {
        (Family::I32, Eq) => EqI32,
        (Family::I32, Ne) => NeI32,
        (Family::I32, Lt) => LtI32,
        (Family::I32, Le) => LeI32,
        (Family::I32, Gt) => GtI32,
        (Family::I32, Ge) => GeI32,
        (Family::U32, Eq) => EqU32,
        (Family::U32, Ne) => NeU32,
        (Family::U32, Lt) => LtU32,
        (Family::U32, Le) => LeU32,
        (Family::U32, Gt) => GtU32,
        (Family::U32, Ge) => GeU32,
        (Family::I64, Eq) => EqI64,
        (Family::I64, Ne) => NeI64,
        (Family::I64, Lt) => LtI64,
        (Family::I64, Le) => LeI64,
        (Family::I64, Gt) => GtI64,
        (Family::I64, Ge) => GeI64,
        (Family::U64, Eq) => EqU64,
        (Family::U64, Ne) => NeU64,
        (Family::U64, Lt) => LtU64,
        (Family::U64, Le) => LeU64,
        (Family::U64, Gt) => GtU64,
        (Family::U64, Ge) => GeU64,
        _ => return None,
    })
}
