use bytes::Bytes;
use indexmap::IndexMap;

/// Dictionary entries in the order their keys first appeared in the input.
pub type BDict = IndexMap<String, BValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BKind {
	ByteString(Bytes), // raw bytes for any string
	Integer(i64),
	List(Vec<BValue>),
	Dict(BDict) // keys are always UTF-8, others are dropped while decoding
}

/// A decoded node together with the exact input bytes it was parsed from.
///
/// The span is shared with the decoded buffer, so hashing a sub-tree (the
/// torrent `info` dictionary for example) works on the original bytes
/// rather than a re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BValue {
	kind: BKind,
	span: Bytes,
}

impl BValue {
	pub(crate) fn new(kind: BKind, span: Bytes) -> Self {
		BValue { kind, span }
	}

	pub fn kind(&self) -> &BKind {
		&self.kind
	}

	pub fn into_kind(self) -> BKind {
		self.kind
	}

	/// Original bytes of this node, from its opening byte to its closing byte.
	pub fn span(&self) -> &Bytes {
		&self.span
	}

	pub fn as_integer(&self) -> Option<i64> {
		match &self.kind {
			BKind::Integer(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match &self.kind {
			BKind::ByteString(b) => Some(b),
			_ => None,
		}
	}

	/// The byte string as text, if it is one and is valid UTF-8.
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	pub fn as_list(&self) -> Option<&[BValue]> {
		match &self.kind {
			BKind::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_dict(&self) -> Option<&BDict> {
		match &self.kind {
			BKind::Dict(map) => Some(map),
			_ => None,
		}
	}

	/// Looks up a dictionary entry by `&str` or a list element by `usize`.
	///
	/// ```
	/// use rusbit_meta::decode;
	///
	/// let value = decode(b"d4:spaml1:a1:bee").unwrap();
	/// let second = value.get("spam").and_then(|list| list.get(1));
	/// assert_eq!(second.and_then(|v| v.as_str()), Some("b"));
	/// ```
	pub fn get<I: BIndex>(&self, index: I) -> Option<&BValue> {
		index.lookup(self)
	}

	/// Iterates over `(key, child)` pairs: names for dictionaries, positions
	/// for lists, nothing for scalars.
	pub fn children(&self) -> Children<'_> {
		let inner = match &self.kind {
			BKind::List(items) => ChildrenInner::List(items.iter().enumerate()),
			BKind::Dict(map) => ChildrenInner::Dict(map.iter()),
			_ => ChildrenInner::Empty,
		};
		Children { inner }
	}
}

/// Types usable with [`BValue::get`].
pub trait BIndex {
	fn lookup<'v>(&self, value: &'v BValue) -> Option<&'v BValue>;
}

impl BIndex for str {
	fn lookup<'v>(&self, value: &'v BValue) -> Option<&'v BValue> {
		value.as_dict()?.get(self)
	}
}

impl BIndex for String {
	fn lookup<'v>(&self, value: &'v BValue) -> Option<&'v BValue> {
		self.as_str().lookup(value)
	}
}

impl BIndex for usize {
	fn lookup<'v>(&self, value: &'v BValue) -> Option<&'v BValue> {
		value.as_list()?.get(*self)
	}
}

impl<T: BIndex + ?Sized> BIndex for &T {
	fn lookup<'v>(&self, value: &'v BValue) -> Option<&'v BValue> {
		(**self).lookup(value)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BKey<'a> {
	Name(&'a str),
	Index(usize),
}

pub struct Children<'a> {
	inner: ChildrenInner<'a>,
}

enum ChildrenInner<'a> {
	List(std::iter::Enumerate<std::slice::Iter<'a, BValue>>),
	Dict(indexmap::map::Iter<'a, String, BValue>),
	Empty,
}

impl<'a> Iterator for Children<'a> {
	type Item = (BKey<'a>, &'a BValue);

	fn next(&mut self) -> Option<Self::Item> {
		match &mut self.inner {
			ChildrenInner::List(iter) => iter.next().map(|(i, v)| (BKey::Index(i), v)),
			ChildrenInner::Dict(iter) => iter.next().map(|(k, v)| (BKey::Name(k.as_str()), v)),
			ChildrenInner::Empty => None,
		}
	}
}
