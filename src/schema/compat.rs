//! Decides whether a reader schema can consume data produced under a writer
//! schema
//!
//! The check is purely structural: no byte I/O, no errors for mismatches.
//! Cyclic graphs terminate through a memo table with an optimistic `true` on
//! re-entry (bisimulation).

use super::{
	ascii_ci_cmp, ascii_ci_eq, ComplexSchema, EnumSchema, Primitive, ReadSchema, SchemaCollection,
	SchemaKey, SchemaNode, UnionSchema, WriteSchema,
};

use std::{cmp::Ordering, collections::HashMap};

/// How tolerant the compatibility check is
///
/// `Strict` demands that the writer produce exactly what the reader expects:
/// no skipped fields, no defaulted fields, no widening, no extra enum or
/// union members on the reader side. `Relaxed` admits all of those.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompatMode {
	Strict,
	Relaxed,
}

impl ReadSchema<'_> {
	/// Can a message produced under `writer` be consumed by this reader?
	pub fn can_read_from(&self, writer: &WriteSchema<'_>, mode: CompatMode) -> bool {
		Checker {
			read: self.collection,
			write: writer.collection,
			mode,
			memo: HashMap::new(),
		}
		.check(self.key, writer.key)
	}
}

struct Checker<'r, 'w> {
	read: &'r SchemaCollection,
	write: &'w SchemaCollection,
	mode: CompatMode,
	memo: HashMap<(usize, usize), bool>,
}

impl Checker<'_, '_> {
	fn relaxed(&self) -> bool {
		self.mode == CompatMode::Relaxed
	}

	fn check(&mut self, r: SchemaKey, w: SchemaKey) -> bool {
		let memoize = self.read[r].is_by_ref() && self.write[w].is_by_ref();
		if memoize {
			if let Some(&known) = self.memo.get(&(r.idx(), w.idx())) {
				return known;
			}
			// Optimistic assumption on re-entry keeps cycles terminating
			self.memo.insert((r.idx(), w.idx()), true);
		}
		let ok = self.check_uncached(r, w);
		if memoize {
			self.memo.insert((r.idx(), w.idx()), ok);
		}
		ok
	}

	fn check_uncached(&mut self, r: SchemaKey, w: SchemaKey) -> bool {
		let read = self.read;
		let write = self.write;
		match (&read[r], &write[w]) {
			// An empty reader sees the empty value whatever the writer sent,
			// except under strict mode where only empty-for-empty holds
			(SchemaNode::Empty, SchemaNode::Empty) => true,
			(SchemaNode::Empty, _) => self.relaxed(),
			(SchemaNode::Primitive(rp), SchemaNode::Primitive(wp)) => {
				rp == wp || (self.relaxed() && widens(*wp, *rp))
			}
			(SchemaNode::Nullable(ri), SchemaNode::Nullable(wi)) => self.check(*ri, *wi),
			// A value that is always present satisfies a reader prepared for
			// its absence; the converse does not hold
			(SchemaNode::Nullable(ri), _) => self.check(*ri, w),
			(_, SchemaNode::Nullable(_)) => false,
			(SchemaNode::Sequence(re), SchemaNode::Sequence(we)) => self.check(*re, *we),
			(
				SchemaNode::Mapping {
					key: rk,
					value: rv,
				},
				SchemaNode::Mapping {
					key: wk,
					value: wv,
				},
			) => {
				let (rk, rv, wk, wv) = (*rk, *rv, *wk, *wv);
				self.check(rk, wk) && self.check(rv, wv)
			}
			(SchemaNode::Tuple(re), SchemaNode::Tuple(we)) => {
				re.len() == we.len()
					&& re
						.iter()
						.zip(we.iter())
						.all(|(relem, welem)| self.check(*relem, *welem))
			}
			(SchemaNode::Enum(re), SchemaNode::Enum(we)) => self.enum_compat(re, we),
			(SchemaNode::Complex(rc), SchemaNode::Complex(wc)) => self.complex_compat(rc, wc),
			(SchemaNode::Union(ru), SchemaNode::Union(wu)) => self.union_compat(ru, wu),
			_ => false,
		}
	}

	fn enum_compat(&mut self, re: &EnumSchema, we: &EnumSchema) -> bool {
		let covered = we
			.members
			.iter()
			.all(|wm| re.members.iter().any(|rm| ascii_ci_eq(rm, wm)));
		match self.mode {
			CompatMode::Relaxed => covered,
			CompatMode::Strict => {
				covered
					&& re
						.members
						.iter()
						.all(|rm| we.members.iter().any(|wm| ascii_ci_eq(rm, wm)))
			}
		}
	}

	fn complex_compat(&mut self, rc: &ComplexSchema, wc: &ComplexSchema) -> bool {
		// Both field lists are sorted under the ASCII fold, so this is a
		// plain merge
		let mut ri = rc.fields.iter().peekable();
		let mut wi = wc.fields.iter().peekable();
		loop {
			match (ri.peek(), wi.peek()) {
				(None, None) => return true,
				// The writer will not supply this reader field: tolerable
				// only in relaxed mode, and only with a default to fall on
				(Some(rf), None) => {
					if !self.relaxed() || !rf.has_default {
						return false;
					}
					ri.next();
				}
				// The writer supplies a field the reader does not know
				(None, Some(_)) => {
					if !self.relaxed() {
						return false;
					}
					wi.next();
				}
				(Some(rf), Some(wf)) => match ascii_ci_cmp(&rf.name, &wf.name) {
					Ordering::Equal => {
						if !self.check(rf.schema, wf.schema) {
							return false;
						}
						ri.next();
						wi.next();
					}
					Ordering::Less => {
						if !self.relaxed() || !rf.has_default {
							return false;
						}
						ri.next();
					}
					Ordering::Greater => {
						if !self.relaxed() {
							return false;
						}
						wi.next();
					}
				},
			}
		}
	}

	fn union_compat(&mut self, ru: &UnionSchema, wu: &UnionSchema) -> bool {
		let mut ri = ru.members.iter().peekable();
		let mut wi = wu.members.iter().peekable();
		loop {
			match (ri.peek(), wi.peek()) {
				(None, None) => return true,
				// Extra reader members can simply never be dispatched to
				(Some(_), None) => {
					if !self.relaxed() {
						return false;
					}
					ri.next();
				}
				// A writer member the reader cannot dispatch is fatal in
				// both modes
				(None, Some(_)) => return false,
				(Some(rm), Some(wm)) => match ascii_ci_cmp(&rm.name, &wm.name) {
					Ordering::Equal => {
						if !self.check(rm.schema, wm.schema) {
							return false;
						}
						ri.next();
						wi.next();
					}
					Ordering::Less => {
						if !self.relaxed() {
							return false;
						}
						ri.next();
					}
					Ordering::Greater => return false,
				},
			}
		}
	}
}

/// The widening table: lossless primitive conversions admitted in relaxed
/// mode only
fn widens(w: Primitive, r: Primitive) -> bool {
	use Primitive::*;
	matches!(
		(w, r),
		(Int8, Int16 | Int32 | Int64)
			| (Int16, Int32 | Int64)
			| (Int32, Int64)
			| (UInt8, UInt16 | UInt32 | UInt64 | Int16 | Int32 | Int64)
			| (UInt16, UInt32 | UInt64 | Int32 | Int64)
			| (UInt32, UInt64 | Int64)
			| (Float32, Float64)
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn widening_is_one_way() {
		assert!(widens(Primitive::Int8, Primitive::Int64));
		assert!(widens(Primitive::UInt8, Primitive::Int16));
		assert!(widens(Primitive::Float32, Primitive::Float64));
		assert!(!widens(Primitive::Int64, Primitive::Int32));
		assert!(!widens(Primitive::Int8, Primitive::UInt16));
		assert!(!widens(Primitive::UInt64, Primitive::Int64));
		assert!(!widens(Primitive::Float64, Primitive::Float32));
		assert!(!widens(Primitive::Int32, Primitive::Float64));
	}
}
