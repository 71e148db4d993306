//! Lexical scopes for one traversal.
//!
//! Frames live in an append-only arena and are addressed by [`ScopeId`].
//! Pushing a frame makes it current; popping moves `current` back to the
//! parent. Popped frames stay in the arena, so a `ScopeId` captured in a
//! lookup result never dangles, but nothing walks into them again.
//!
//! Traversal-wide state is kept here as typed fields: the stack of enclosing
//! calls whose arguments are being visited, and the module's static imports.
//!
//! While a journal is open every binding change is recorded with a caller
//! chosen tag, so that changes made on behalf of nodes a requestor never
//! accepted can be undone.

use std::mem;

use gravy_ast::ExprId;
use gravy_common::Span;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::decl::Declaration;
use crate::ty::{names, TypeDescriptor};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The construct that opened a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeOwner {
    Module { name: String },
    Type { ty: TypeDescriptor, is_script: bool },
    Method {
        declaring: TypeDescriptor,
        name: String,
        /// The synthetic `run` method of a script.
        is_script_body: bool,
    },
    Field { declaring: TypeDescriptor, name: String },
    Initializer { declaring: TypeDescriptor },
    Closure { id: ExprId },
    Block,
}

/// A name bound in some frame.
#[derive(Clone, Debug)]
pub struct VariableInfo {
    pub ty: TypeDescriptor,
    pub declaring_type: Option<TypeDescriptor>,
    /// Declared with a concrete type rather than `def`.
    pub explicit: bool,
    /// An import alias standing for a class rather than a value.
    pub type_alias: bool,
    pub span: Option<Span>,
}

impl VariableInfo {
    pub fn new(ty: TypeDescriptor, declaring_type: Option<TypeDescriptor>) -> Self {
        VariableInfo {
            ty,
            declaring_type,
            explicit: false,
            type_alias: false,
            span: None,
        }
    }

    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }
}

/// Order in which an unqualified name inside a closure is looked up
/// against the closure's delegate and owner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolveStrategy {
    OwnerFirst,
    DelegateFirst,
    OwnerOnly,
    DelegateOnly,
    SelfOnly,
}

/// Implicit receivers of one closure.
#[derive(Clone, Debug)]
pub struct ClosureFrame {
    pub owner: TypeDescriptor,
    pub delegate: TypeDescriptor,
    pub this_type: TypeDescriptor,
    pub strategy: ResolveStrategy,
}

/// A call whose arguments are being visited, with what its method name
/// resolved to.
#[derive(Clone, Debug)]
pub struct CallAndType {
    pub call: ExprId,
    pub method: String,
    pub receiver: TypeDescriptor,
    pub declaring_type: TypeDescriptor,
    pub declaration: Option<Declaration>,
    pub arg_ids: Vec<ExprId>,
}

impl CallAndType {
    pub fn has_arg(&self, id: ExprId) -> bool {
        self.arg_ids.contains(&id)
    }

    pub fn arg_position(&self, id: ExprId) -> Option<usize> {
        self.arg_ids.iter().position(|a| *a == id)
    }
}

/// `import static Owner.member [as alias]` or `import static Owner.*`.
#[derive(Clone, Debug)]
pub struct StaticImport {
    pub owner: TypeDescriptor,
    pub member: Option<String>,
    pub alias: Option<String>,
}

impl StaticImport {
    /// The member name imported under `name`, if this import covers it.
    pub fn member_for(&self, name: &str) -> Option<String> {
        match (&self.member, &self.alias) {
            (Some(member), Some(alias)) => (alias == name).then(|| member.clone()),
            (Some(member), None) => (member == name).then(|| member.clone()),
            (None, _) => Some(name.to_string()),
        }
    }
}

/// One binding change made while a journal was open.
#[derive(Clone, Debug)]
pub struct BindingChange {
    frame: ScopeId,
    name: String,
    before: Option<VariableInfo>,
    after: Option<VariableInfo>,
    /// The tag current when the change was made.
    pub tag: Option<usize>,
}

#[derive(Debug, Default)]
struct Journal {
    tag: Option<usize>,
    changes: Vec<BindingChange>,
}

#[derive(Debug)]
struct Frame {
    parent: Option<ScopeId>,
    owner: ScopeOwner,
    is_static: bool,
    bindings: FxHashMap<String, VariableInfo>,
    categories: Vec<TypeDescriptor>,
    category_being_declared: Option<TypeDescriptor>,
    closure: Option<ClosureFrame>,
}

#[derive(Debug)]
pub struct ScopeTree {
    frames: Vec<Frame>,
    current: Option<ScopeId>,
    open: usize,
    default_categories: Vec<TypeDescriptor>,
    call_stack: Vec<CallAndType>,
    static_imports: Vec<StaticImport>,
    journal: Option<Journal>,
}

impl ScopeTree {
    /// An empty tree. The two default extension classes are always in
    /// scope, followed by `extra_categories`.
    pub fn new(extra_categories: &[String]) -> Self {
        let mut default_categories = vec![
            TypeDescriptor::class(names::DEFAULT_GROOVY_METHODS),
            TypeDescriptor::class(names::DEFAULT_GROOVY_STATIC_METHODS),
        ];
        default_categories.extend(extra_categories.iter().map(TypeDescriptor::class));
        ScopeTree {
            frames: Vec::new(),
            current: None,
            open: 0,
            default_categories,
            call_stack: Vec::new(),
            static_imports: Vec::new(),
            journal: None,
        }
    }

    /// Open a frame below the current one.
    pub fn push(&mut self, owner: ScopeOwner, is_static: bool) -> ScopeId {
        self.push_with_parent(self.current, owner, is_static)
    }

    /// Open a frame below `parent` (or a new root) and make it current.
    /// Static-ness is inherited from the parent.
    pub fn push_with_parent(
        &mut self,
        parent: Option<ScopeId>,
        owner: ScopeOwner,
        is_static: bool,
    ) -> ScopeId {
        let inherited = parent.is_some_and(|p| self.frame(p).is_static);
        let id = ScopeId(self.frames.len() as u32);
        debug!(scope = id.0, ?owner, "push scope");
        self.frames.push(Frame {
            parent,
            owner,
            is_static: is_static || inherited,
            bindings: FxHashMap::default(),
            categories: Vec::new(),
            category_being_declared: None,
            closure: None,
        });
        self.current = Some(id);
        self.open += 1;
        id
    }

    /// Close the current frame. Popping with nothing open is tolerated.
    pub fn pop(&mut self) -> Option<ScopeId> {
        let Some(id) = self.current else {
            debug!("pop with no open scope");
            return None;
        };
        debug!(scope = id.0, "pop scope");
        self.current = self.frame(id).parent;
        self.open = self.open.saturating_sub(1);
        Some(id)
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    /// Frames pushed and not yet popped.
    pub fn open_frames(&self) -> usize {
        self.open
    }

    fn frame(&self, id: ScopeId) -> &Frame {
        &self.frames[id.index()]
    }

    fn frame_mut(&mut self, id: ScopeId) -> &mut Frame {
        &mut self.frames[id.index()]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.frame(id).parent
    }

    pub fn owner(&self, id: ScopeId) -> &ScopeOwner {
        &self.frame(id).owner
    }

    pub fn is_static(&self, id: ScopeId) -> bool {
        self.frame(id).is_static
    }

    /// `id` and its ancestors, innermost first.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |s| self.frame(*s).parent)
    }

    // ── Bindings ─────────────────────────────────────────────────────

    /// Find `name` in `id` or the nearest ancestor binding it.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&VariableInfo> {
        self.chain(id)
            .find_map(|s| self.frame(s).bindings.get(name))
    }

    pub fn lookup_in_frame(&self, id: ScopeId, name: &str) -> Option<&VariableInfo> {
        self.frame(id).bindings.get(name)
    }

    /// Add (or replace) a binding in frame `id`.
    pub fn bind(&mut self, id: ScopeId, name: impl Into<String>, info: VariableInfo) {
        let name = name.into();
        let after = self.journal.is_some().then(|| info.clone());
        let before = self.frame_mut(id).bindings.insert(name.clone(), info);
        self.log(id, name, before, after);
    }

    /// Update the nearest existing binding of `name`. The declaring type is
    /// only filled in when it was unknown. Returns `false` (and changes
    /// nothing) when `name` is not bound.
    pub fn rebind(
        &mut self,
        id: ScopeId,
        name: &str,
        ty: TypeDescriptor,
        declaring_type: Option<TypeDescriptor>,
    ) -> bool {
        let Some(owner) = self
            .chain(id)
            .find(|s| self.frame(*s).bindings.contains_key(name))
        else {
            return false;
        };
        let journaling = self.journal.is_some();
        let Some(info) = self.frame_mut(owner).bindings.get_mut(name) else {
            return false;
        };
        let before = journaling.then(|| info.clone());
        info.ty = ty;
        if info.declaring_type.is_none() {
            info.declaring_type = declaring_type;
        }
        let after = journaling.then(|| info.clone());
        if journaling {
            self.log(owner, name.to_string(), before, after);
        }
        true
    }

    // ── Journal ──────────────────────────────────────────────────────

    /// Start recording binding changes. Any journal already open is
    /// discarded.
    pub fn open_journal(&mut self) {
        self.journal = Some(Journal::default());
    }

    /// Tag subsequent changes with `tag`, returning the previous tag.
    pub fn set_journal_tag(&mut self, tag: Option<usize>) -> Option<usize> {
        match self.journal.as_mut() {
            Some(journal) => mem::replace(&mut journal.tag, tag),
            None => None,
        }
    }

    /// Stop recording and hand back what was recorded, oldest first.
    pub fn close_journal(&mut self) -> Vec<BindingChange> {
        self.journal.take().map(|j| j.changes).unwrap_or_default()
    }

    /// Undo `changes` except those whose tag `keep` accepts. Untagged
    /// changes are always kept.
    pub fn revert(&mut self, changes: &[BindingChange], keep: impl Fn(usize) -> bool) {
        let kept = |c: &BindingChange| c.tag.map_or(true, &keep);
        if changes.iter().all(kept) {
            return;
        }
        for change in changes.iter().rev() {
            self.set_raw(change.frame, &change.name, change.before.clone());
        }
        for change in changes.iter().filter(|c| kept(*c)) {
            self.set_raw(change.frame, &change.name, change.after.clone());
        }
        debug!(
            reverted = changes.iter().filter(|c| !kept(*c)).count(),
            "reverted binding changes"
        );
    }

    fn set_raw(&mut self, id: ScopeId, name: &str, info: Option<VariableInfo>) {
        let bindings = &mut self.frame_mut(id).bindings;
        match info {
            Some(info) => {
                bindings.insert(name.to_string(), info);
            }
            None => {
                bindings.remove(name);
            }
        }
    }

    fn log(&mut self, frame: ScopeId, name: String, before: Option<VariableInfo>, after: Option<VariableInfo>) {
        if let Some(journal) = self.journal.as_mut() {
            journal.changes.push(BindingChange {
                frame,
                name,
                before,
                after,
                tag: journal.tag,
            });
        }
    }

    // ── Enclosing constructs ─────────────────────────────────────────

    pub fn enclosing(&self, id: ScopeId, pred: impl Fn(&ScopeOwner) -> bool) -> Option<ScopeId> {
        self.chain(id).find(|s| pred(&self.frame(*s).owner))
    }

    pub fn enclosing_type(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| matches!(o, ScopeOwner::Type { .. }))
    }

    pub fn enclosing_method(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| matches!(o, ScopeOwner::Method { .. }))
    }

    pub fn enclosing_closure(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| matches!(o, ScopeOwner::Closure { .. }))
    }

    pub fn enclosing_field(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| matches!(o, ScopeOwner::Field { .. }))
    }

    pub fn enclosing_module(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| matches!(o, ScopeOwner::Module { .. }))
    }

    /// The innermost frame that owns free-standing bindings: a closure or
    /// a method body.
    pub fn enclosing_body(&self, id: ScopeId) -> Option<ScopeId> {
        self.enclosing(id, |o| {
            matches!(o, ScopeOwner::Closure { .. } | ScopeOwner::Method { .. })
        })
    }

    /// The type `this` refers to: the innermost enclosing type body.
    pub fn this_type(&self, id: ScopeId) -> Option<&TypeDescriptor> {
        match self.enclosing_type(id).map(|s| &self.frame(s).owner) {
            Some(ScopeOwner::Type { ty, .. }) => Some(ty),
            _ => None,
        }
    }

    /// Whether the innermost method or closure is a script's top level.
    pub fn in_script_body(&self, id: ScopeId) -> bool {
        matches!(
            self.enclosing_method(id).map(|s| &self.frame(s).owner),
            Some(ScopeOwner::Method {
                is_script_body: true,
                ..
            })
        )
    }

    // ── Closures ─────────────────────────────────────────────────────

    pub fn set_closure(&mut self, id: ScopeId, closure: ClosureFrame) {
        self.frame_mut(id).closure = Some(closure);
    }

    pub fn closure(&self, id: ScopeId) -> Option<&ClosureFrame> {
        self.frame(id).closure.as_ref()
    }

    /// Types an unqualified name is looked up against, in search order,
    /// following each enclosing closure's resolve strategy outwards.
    pub fn implicit_receivers(&self, id: ScopeId) -> Vec<TypeDescriptor> {
        let mut out = Vec::new();
        self.collect_receivers(id, &mut out);
        let mut seen: Vec<TypeDescriptor> = Vec::with_capacity(out.len());
        for ty in out {
            if !seen.contains(&ty) {
                seen.push(ty);
            }
        }
        seen
    }

    fn collect_receivers(&self, id: ScopeId, out: &mut Vec<TypeDescriptor>) {
        let Some(closure_scope) = self.enclosing_closure(id) else {
            out.extend(self.this_type(id).cloned());
            return;
        };
        let Some(closure) = self.closure(closure_scope) else {
            out.extend(self.this_type(id).cloned());
            return;
        };
        let outer = self.parent(closure_scope);
        let owner_side = |out: &mut Vec<TypeDescriptor>| match outer {
            Some(p) => self.collect_receivers(p, out),
            None => out.push(closure.owner.clone()),
        };
        match closure.strategy {
            ResolveStrategy::OwnerFirst => {
                owner_side(out);
                out.push(closure.delegate.clone());
            }
            ResolveStrategy::DelegateFirst => {
                out.push(closure.delegate.clone());
                owner_side(out);
            }
            ResolveStrategy::OwnerOnly => owner_side(out),
            ResolveStrategy::DelegateOnly => out.push(closure.delegate.clone()),
            ResolveStrategy::SelfOnly => out.push(TypeDescriptor::class(names::CLOSURE)),
        }
    }

    // ── Categories ───────────────────────────────────────────────────

    /// Extension classes in scope at `id`: the defaults, then those added
    /// by enclosing `use` blocks from the root downward.
    pub fn categories(&self, id: ScopeId) -> Vec<TypeDescriptor> {
        let mut frames: Vec<ScopeId> = self.chain(id).collect();
        frames.reverse();
        let mut out = self.default_categories.clone();
        for s in frames {
            for cat in &self.frame(s).categories {
                if !out.contains(cat) {
                    out.push(cat.clone());
                }
            }
        }
        out
    }

    pub fn add_category(&mut self, id: ScopeId, category: TypeDescriptor) {
        self.frame_mut(id).categories.push(category);
    }

    /// Record the class a `use(...)` call at `id` is about to bring into
    /// scope for its closure argument.
    pub fn set_category_being_declared(&mut self, id: ScopeId, category: Option<TypeDescriptor>) {
        self.frame_mut(id).category_being_declared = category;
    }

    /// The category recorded one frame up: a `use` block's body sees the
    /// value its caller recorded.
    pub fn category_being_declared(&self, id: ScopeId) -> Option<&TypeDescriptor> {
        let parent = self.parent(id)?;
        self.frame(parent).category_being_declared.as_ref()
    }

    // ── Traversal-wide state ─────────────────────────────────────────

    pub fn push_call(&mut self, call: CallAndType) {
        self.call_stack.push(call);
    }

    pub fn pop_call(&mut self) -> Option<CallAndType> {
        self.call_stack.pop()
    }

    pub fn current_call(&self) -> Option<&CallAndType> {
        self.call_stack.last()
    }

    pub fn open_calls(&self) -> usize {
        self.call_stack.len()
    }

    pub fn add_static_import(&mut self, import: StaticImport) {
        self.static_imports.push(import);
    }

    pub fn static_imports(&self) -> &[StaticImport] {
        &self.static_imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> TypeDescriptor {
        TypeDescriptor::string()
    }

    #[test]
    fn nearest_binding_wins() {
        let mut tree = ScopeTree::new(&[]);
        let s0 = tree.push(ScopeOwner::Module { name: "m".into() }, false);
        tree.bind(s0, "x", VariableInfo::new(TypeDescriptor::int(), None));
        let s1 = tree.push(ScopeOwner::Block, false);
        tree.bind(s1, "x", VariableInfo::new(string(), None));
        let s2 = tree.push(ScopeOwner::Block, false);
        tree.bind(s2, "x", VariableInfo::new(TypeDescriptor::boolean(), None));

        assert_eq!(tree.lookup(s2, "x").unwrap().ty.name(), "boolean");
        tree.pop();
        let current = tree.current().unwrap();
        assert_eq!(current, s1);
        assert_eq!(tree.lookup(current, "x").unwrap().ty, string());
        assert!(tree.lookup_in_frame(current, "y").is_none());
    }

    #[test]
    fn static_is_inherited() {
        let mut tree = ScopeTree::new(&[]);
        tree.push(ScopeOwner::Block, false);
        let method = tree.push(ScopeOwner::Block, true);
        let inner = tree.push(ScopeOwner::Block, false);
        assert!(tree.is_static(method));
        assert!(tree.is_static(inner));
    }

    #[test]
    fn rebind_updates_existing_only() {
        let mut tree = ScopeTree::new(&[]);
        let outer = tree.push(ScopeOwner::Block, false);
        tree.bind(outer, "x", VariableInfo::new(string(), None));
        let inner = tree.push(ScopeOwner::Block, false);

        assert!(tree.rebind(inner, "x", TypeDescriptor::int(), Some(string())));
        assert!(tree.lookup_in_frame(inner, "x").is_none());
        let info = tree.lookup(inner, "x").unwrap();
        assert_eq!(info.ty.name(), "int");
        assert_eq!(info.declaring_type.as_ref(), Some(&string()));

        assert!(!tree.rebind(inner, "missing", TypeDescriptor::int(), None));
        assert!(tree.lookup(inner, "missing").is_none());
    }

    #[test]
    fn revert_undoes_rejected_tags_only() {
        let mut tree = ScopeTree::new(&[]);
        let body = tree.push(ScopeOwner::Block, false);
        tree.bind(body, "count", VariableInfo::new(TypeDescriptor::int(), None));

        tree.open_journal();
        tree.set_journal_tag(Some(1));
        tree.bind(body, "total", VariableInfo::new(TypeDescriptor::int(), None));
        let previous = tree.set_journal_tag(Some(4));
        assert_eq!(previous, Some(1));
        tree.rebind(body, "count", string(), None);
        tree.bind(body, "fresh", VariableInfo::new(string(), None));
        tree.set_journal_tag(Some(1));
        tree.rebind(body, "total", TypeDescriptor::class("java.lang.Long"), None);
        let changes = tree.close_journal();
        assert_eq!(changes.len(), 4);

        tree.revert(&changes, |tag| tag != 4);
        assert_eq!(tree.lookup(body, "count").unwrap().ty.name(), "int");
        assert!(tree.lookup(body, "fresh").is_none());
        assert_eq!(tree.lookup(body, "total").unwrap().ty.name(), "java.lang.Long");
    }

    #[test]
    fn nothing_is_recorded_without_a_journal() {
        let mut tree = ScopeTree::new(&[]);
        let body = tree.push(ScopeOwner::Block, false);
        tree.bind(body, "x", VariableInfo::new(string(), None));
        assert!(tree.close_journal().is_empty());
        assert_eq!(tree.set_journal_tag(Some(3)), None);
    }

    #[test]
    fn pop_past_root_is_tolerated() {
        let mut tree = ScopeTree::new(&[]);
        tree.push(ScopeOwner::Block, false);
        assert!(tree.pop().is_some());
        assert!(tree.pop().is_none());
        assert_eq!(tree.open_frames(), 0);
    }

    #[test]
    fn categories_accumulate_downward() {
        let mut tree = ScopeTree::new(&["demo.Extra".to_string()]);
        let root = tree.push(ScopeOwner::Block, false);
        tree.add_category(root, TypeDescriptor::class("demo.A"));
        let child = tree.push(ScopeOwner::Block, false);
        tree.add_category(child, TypeDescriptor::class("demo.B"));

        let names: Vec<String> = tree
            .categories(child)
            .iter()
            .map(|c| c.simple_name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["DefaultGroovyMethods", "DefaultGroovyStaticMethods", "Extra", "A", "B"]
        );
        assert_eq!(tree.categories(root).len(), 4);
    }

    #[test]
    fn category_being_declared_is_read_one_frame_below() {
        let mut tree = ScopeTree::new(&[]);
        let caller = tree.push(ScopeOwner::Block, false);
        tree.set_category_being_declared(caller, Some(TypeDescriptor::class("demo.Cat")));
        assert!(tree.category_being_declared(caller).is_none());
        let body = tree.push(ScopeOwner::Closure { id: ExprId(1) }, false);
        assert_eq!(
            tree.category_being_declared(body).map(|c| c.name()),
            Some("demo.Cat")
        );
    }

    #[test]
    fn receivers_follow_resolve_strategy() {
        let script = TypeDescriptor::class("demo.Script");
        let builder = TypeDescriptor::class("demo.Builder");
        let mut tree = ScopeTree::new(&[]);
        tree.push(
            ScopeOwner::Type {
                ty: script.clone(),
                is_script: true,
            },
            false,
        );
        let outer = tree.push(ScopeOwner::Closure { id: ExprId(1) }, false);
        tree.set_closure(
            outer,
            ClosureFrame {
                owner: script.clone(),
                delegate: builder.clone(),
                this_type: script.clone(),
                strategy: ResolveStrategy::DelegateFirst,
            },
        );
        assert_eq!(tree.implicit_receivers(outer), vec![builder.clone(), script.clone()]);

        let inner = tree.push(ScopeOwner::Closure { id: ExprId(2) }, false);
        tree.set_closure(
            inner,
            ClosureFrame {
                owner: TypeDescriptor::class(names::CLOSURE),
                delegate: TypeDescriptor::class(names::CLOSURE),
                this_type: script.clone(),
                strategy: ResolveStrategy::OwnerFirst,
            },
        );
        assert_eq!(
            tree.implicit_receivers(inner),
            vec![builder, script, TypeDescriptor::class(names::CLOSURE)]
        );
    }

    #[test]
    fn static_import_members() {
        let all = StaticImport {
            owner: TypeDescriptor::class("java.lang.Math"),
            member: None,
            alias: None,
        };
        assert_eq!(all.member_for("max").as_deref(), Some("max"));
        let aliased = StaticImport {
            owner: TypeDescriptor::class("java.lang.Math"),
            member: Some("max".into()),
            alias: Some("biggest".into()),
        };
        assert_eq!(aliased.member_for("biggest").as_deref(), Some("max"));
        assert_eq!(aliased.member_for("max"), None);
    }
}
