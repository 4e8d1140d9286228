use std::{
    hash::{Hash, Hasher},
    ops::Range,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use url::Url;

use crate::bencode::{decode, decode_buf, BDict, BIndex, BKind, BValue};
use crate::torrent::{calculate_info_hash, TorrentError};
use crate::utils::url_encode_bytes;

const PIECE_HASH_LEN: usize = 20;

/// A parsed .torrent file. Two descriptors are equal when their content
/// hashes are, whatever the rest of their metadata says.
#[derive(Debug, Clone)]
pub struct Torrent {
    info_hash: [u8; 20],
    content_hash: String,
    name: Option<String>,
    comment: Option<String>,
    created_by: Option<String>,
    creation_date: Option<DateTime<Utc>>,
    announce: Url,
    announce_list: Vec<Url>,
    files: Vec<FileEntry>,
    length: u64,
    piece_length: u64,
    piece_hashes: Vec<String>,
    private: bool,
    root: BValue,
}

/// One file of the torrent and the bytes it occupies in the concatenated
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Vec<String>,
    pub length: u64,
    pub range: Range<u64>,
}

impl FileEntry {
    pub fn relative_path(&self) -> PathBuf {
        self.path.iter().collect()
    }
}

impl Torrent {
    /// Reads a .torrent file from disk and builds a descriptor from it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TorrentError> {
        let buf = std::fs::read(path.as_ref())?;
        debug!("Read {} bytes from {}", buf.len(), path.as_ref().display());
        let root = decode_buf(Bytes::from(buf))?;
        Self::from_bvalue(&root)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TorrentError> {
        let root = decode(bytes)?;
        Self::from_bvalue(&root)
    }

    /// Creates a `Torrent` from a decoded metainfo dictionary.
    ///
    /// Fails if any required field is missing or invalid; there is no
    /// partially built descriptor.
    pub fn from_bvalue(value: &BValue) -> Result<Self, TorrentError> {
        let root_dict = value.as_dict().ok_or(TorrentError::InvalidField("root"))?;

        let info = lookup(root_dict, "info")?;
        let info_dict = info.as_dict().ok_or(TorrentError::InvalidField("info"))?;
        let info_hash = calculate_info_hash(info);

        let name = get_text(info_dict, "name");
        let comment = get_text(root_dict, "comment");
        let created_by = get_text(root_dict, "created by");
        let creation_date = root_dict
            .get("creation date")
            .and_then(BValue::as_integer)
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        let files = collect_files(info_dict, name.as_deref())?;

        let piece_length = get_positive_integer(info_dict, "piece length")?;
        let pieces = lookup_bytestring(info_dict, "pieces")?;
        let piece_hashes = split_piece_hashes(pieces)?;

        let announce = parse_announce(lookup(root_dict, "announce")?)?;

        let mut announce_list = Vec::new();
        if let Some(tiers) = root_dict.get("announce-list") {
            flatten_trackers(tiers, &mut announce_list);
        }
        if announce_list.is_empty() {
            announce_list.push(announce.clone());
        }

        // ranges are already checked for overflow
        let length = files.last().map_or(0, |f| f.range.end);

        let private = info_dict.get("private").and_then(BValue::as_integer) == Some(1);

        Ok(Torrent {
            info_hash,
            content_hash: hex::encode(info_hash),
            name,
            comment,
            created_by,
            creation_date,
            announce,
            announce_list,
            files,
            length,
            piece_length,
            piece_hashes,
            private,
            root: value.clone(),
        })
    }

    /// Raw SHA-1 digest of the info dictionary.
    pub fn info_hash(&self) -> &[u8; 20] {
        &self.info_hash
    }

    /// Lowercase hex form of [`Torrent::info_hash`].
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    pub fn announce(&self) -> &Url {
        &self.announce
    }

    pub fn announce_list(&self) -> &[Url] {
        &self.announce_list
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Total size of all files.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    pub fn piece_hashes(&self) -> &[String] {
        &self.piece_hashes
    }

    pub fn piece_count(&self) -> usize {
        self.piece_hashes.len()
    }

    /// Size of piece `index`. Every piece is `piece_length` long except the
    /// last, which holds whatever is left of the content.
    pub fn piece_size(&self, index: usize) -> Option<u64> {
        if index >= self.piece_hashes.len() {
            return None;
        }
        let start = (index as u64).saturating_mul(self.piece_length);
        Some(self.piece_length.min(self.length.saturating_sub(start)))
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// The decoded metainfo this descriptor was built from.
    pub fn root(&self) -> &BValue {
        &self.root
    }

    pub fn get<I: BIndex>(&self, index: I) -> Option<&BValue> {
        self.root.get(index)
    }

    /// `magnet:` URI carrying the content hash, the name and every tracker.
    pub fn magnet_uri(&self) -> String {
        let mut uri = format!("magnet:?xt=urn:btih:{}", self.content_hash);
        if let Some(name) = &self.name {
            uri.push_str("&dn=");
            uri.push_str(&url_encode_bytes(name.as_bytes()));
        }
        for tracker in &self.announce_list {
            uri.push_str("&tr=");
            uri.push_str(&url_encode_bytes(tracker.as_str().as_bytes()));
        }
        uri
    }
}

impl PartialEq for Torrent {
    fn eq(&self, other: &Self) -> bool {
        self.info_hash == other.info_hash
    }
}

impl Eq for Torrent {}

impl Hash for Torrent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info_hash.hash(state);
    }
}

/// Builds the file layout, either from `info.files` or from the single
/// `info.name`/`info.length` pair, and assigns each file its byte range.
fn collect_files(info: &BDict, name: Option<&str>) -> Result<Vec<FileEntry>, TorrentError> {
    let layout: Vec<(Vec<String>, u64)> = match info.get("files").and_then(BValue::as_list) {
        Some(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let file = file_from_entry(entry);
                if file.is_none() {
                    warn!("Skipping file entry {} without a usable path and length", i);
                }
                file
            })
            .collect(),
        None => {
            let length = info
                .get("length")
                .and_then(BValue::as_integer)
                .and_then(|l| u64::try_from(l).ok());
            match (name, length) {
                (Some(name), Some(length)) => vec![(vec![name.to_string()], length)],
                _ => Vec::new(),
            }
        }
    };

    if layout.is_empty() {
        return Err(TorrentError::NoFilesDescribed);
    }

    let mut offset = 0u64;
    let mut files = Vec::with_capacity(layout.len());
    for (path, length) in layout {
        let start = offset;
        offset = offset
            .checked_add(length)
            .ok_or(TorrentError::InvalidField("length"))?;
        files.push(FileEntry { path, length, range: start..offset });
    }
    Ok(files)
}

fn file_from_entry(entry: &BValue) -> Option<(Vec<String>, u64)> {
    let path = entry
        .get("path")?
        .as_list()?
        .iter()
        .filter_map(|segment| segment.as_str().map(str::to_string))
        .collect();
    let length = u64::try_from(entry.get("length")?.as_integer()?).ok()?;
    Some((path, length))
}

/// Cuts `pieces` into 20-byte digests. A trailing partial digest is dropped.
fn split_piece_hashes(pieces: &[u8]) -> Result<Vec<String>, TorrentError> {
    let chunks = pieces.chunks_exact(PIECE_HASH_LEN);
    if !chunks.remainder().is_empty() {
        warn!(
            "Dropping {} trailing bytes of 'pieces' that do not form a full hash",
            chunks.remainder().len()
        );
    }

    let piece_hashes: Vec<String> = chunks.map(hex::encode).collect();
    if piece_hashes.is_empty() {
        return Err(TorrentError::EmptyPieceList);
    }
    Ok(piece_hashes)
}

fn parse_announce(value: &BValue) -> Result<Url, TorrentError> {
    let text = value
        .as_str()
        .ok_or_else(|| TorrentError::InvalidUrl(String::from_utf8_lossy(value.span()).into_owned()))?;
    Url::parse(text).map_err(|_| TorrentError::InvalidUrl(text.to_string()))
}

/// Collects every parseable tracker URL from an arbitrarily nested
/// `announce-list`, in order.
fn flatten_trackers(value: &BValue, out: &mut Vec<Url>) {
    match value.kind() {
        BKind::ByteString(_) => match value.as_str().map(Url::parse) {
            Some(Ok(url)) => out.push(url),
            _ => debug!("Ignoring invalid tracker URL in announce-list"),
        },
        BKind::List(items) => {
            for item in items {
                flatten_trackers(item, out);
            }
        }
        _ => {}
    }
}

/// Looks up a required key.
fn lookup<'a>(dict: &'a BDict, key: &'static str) -> Result<&'a BValue, TorrentError> {
    dict.get(key).ok_or(TorrentError::MissingRequiredField(key))
}

/// Looks up a required key and returns a byte slice if the value is a ByteString.
fn lookup_bytestring<'a>(dict: &'a BDict, key: &'static str) -> Result<&'a [u8], TorrentError> {
    lookup(dict, key)?
        .as_bytes()
        .ok_or(TorrentError::InvalidField(key))
}

/// Retrieves a required integer that must be greater than zero.
fn get_positive_integer(dict: &BDict, key: &'static str) -> Result<u64, TorrentError> {
    lookup(dict, key)?
        .as_integer()
        .filter(|&n| n > 0)
        .map(|n| n as u64)
        .ok_or(TorrentError::InvalidField(key))
}

/// Optional text field; anything but valid UTF-8 counts as absent.
fn get_text(dict: &BDict, key: &str) -> Option<String> {
    dict.get(key).and_then(BValue::as_str).map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::*;

    const ANNOUNCE: &str = "http://tracker.example.com/announce";
    const SINGLE_HASH: &str = "ca7951678f61929c76d109d48550df0ab678e55e";

    fn bstr(s: &str) -> String {
        format!("{}:{}", s.len(), s)
    }

    fn pieces(n: usize) -> String {
        format!("{}:{}", n, "A".repeat(n))
    }

    fn single_info() -> String {
        format!("d6:lengthi12e4:name8:test.txt12:piece lengthi16384e6:pieces{}e", pieces(20))
    }

    fn multi_info() -> String {
        format!(
            "d5:filesl{}{}e4:name3:dir12:piece lengthi4e6:pieces{}e",
            "d6:lengthi5e4:pathl1:a5:x.binee",
            "d6:lengthi5e4:pathl5:y.txtee",
            pieces(60)
        )
    }

    fn torrent(info: &str, extra: &str) -> Vec<u8> {
        format!("d8:announce{}{}4:info{}e", bstr(ANNOUNCE), extra, info).into_bytes()
    }

    #[test]
    fn test_single_file_torrent() {
        let t = Torrent::from_bytes(&torrent(&single_info(), "")).unwrap();
        assert_eq!(t.content_hash(), SINGLE_HASH);
        assert_eq!(hex::encode(t.info_hash()), SINGLE_HASH);
        assert_eq!(t.name(), Some("test.txt"));
        assert_eq!(t.announce().as_str(), ANNOUNCE);
        assert_eq!(t.announce_list(), &[Url::parse(ANNOUNCE).unwrap()]);
        assert_eq!(
            t.files(),
            &[FileEntry { path: vec!["test.txt".to_string()], length: 12, range: 0..12 }]
        );
        assert_eq!(t.length(), 12);
        assert_eq!(t.piece_length(), 16384);
        assert_eq!(t.piece_hashes(), &["41".repeat(20)]);
        assert!(t.comment().is_none());
        assert!(t.created_by().is_none());
        assert!(t.creation_date().is_none());
        assert!(!t.is_private());
    }

    #[test]
    fn test_multi_file_ranges_are_contiguous() {
        let t = Torrent::from_bytes(&torrent(&multi_info(), "")).unwrap();
        let files = t.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, vec!["a", "x.bin"]);
        assert_eq!(files[0].range, 0..5);
        assert_eq!(files[1].range, 5..10);
        assert_eq!(files[0].relative_path(), PathBuf::from("a").join("x.bin"));
        for pair in files.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
        }
        assert_eq!(t.length(), files.iter().map(|f| f.length).sum::<u64>());
        assert_eq!(t.piece_count(), 3);
    }

    #[test]
    fn test_multi_file_skips_unusable_entries() {
        let info = format!(
            "d5:filesl{}{}{}e12:piece lengthi4e6:pieces{}e",
            "d4:pathl1:zee",
            "d6:lengthi3e4:pathl1:a2:\u{00e9}1:bee",
            "d6:lengthi-1e4:pathl1:cee",
            pieces(20)
        );
        let t = Torrent::from_bytes(&torrent(&info, "")).unwrap();
        assert_eq!(t.files().len(), 1);
        assert_eq!(t.files()[0].path, vec!["a", "\u{00e9}", "b"]);
        assert_eq!(t.files()[0].range, 0..3);
    }

    #[test]
    fn test_non_text_path_segments_dropped() {
        let mut data = format!("d8:announce{}4:infod5:filesld6:lengthi3e4:pathl1:a", bstr(ANNOUNCE)).into_bytes();
        data.extend_from_slice(b"2:\xff\xfe");
        data.extend_from_slice(format!("1:beee12:piece lengthi4e6:pieces{}ee", pieces(20)).as_bytes());
        let t = Torrent::from_bytes(&data).unwrap();
        assert_eq!(t.files()[0].path, vec!["a", "b"]);
    }

    #[test]
    fn test_piece_hashes_drop_partial_chunk() {
        let info = format!("d6:lengthi1e4:name1:x12:piece lengthi1e6:pieces{}e", pieces(45));
        let t = Torrent::from_bytes(&torrent(&info, "")).unwrap();
        assert_eq!(t.piece_hashes().len(), 45 / 20);
    }

    #[test]
    fn test_short_pieces_fail() {
        let info = format!("d6:lengthi1e4:name1:x12:piece lengthi1e6:pieces{}e", pieces(19));
        let err = Torrent::from_bytes(&torrent(&info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::EmptyPieceList));

        let info = "d6:lengthi1e4:name1:x12:piece lengthi1e6:pieces0:e";
        let err = Torrent::from_bytes(&torrent(info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::EmptyPieceList));
    }

    #[test]
    fn test_missing_pieces_fail() {
        let info = "d6:lengthi1e4:name1:x12:piece lengthi1ee";
        let err = Torrent::from_bytes(&torrent(info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::MissingRequiredField("pieces")));

        let info = "d6:lengthi1e4:name1:x12:piece lengthi1e6:piecesi5ee";
        let err = Torrent::from_bytes(&torrent(info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::InvalidField("pieces")));
    }

    #[test]
    fn test_piece_length_must_be_positive() {
        let info = format!("d6:lengthi1e4:name1:x6:pieces{}e", pieces(20));
        let err = Torrent::from_bytes(&torrent(&info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::MissingRequiredField("piece length")));

        let info = format!("d6:lengthi1e4:name1:x12:piece lengthi0e6:pieces{}e", pieces(20));
        let err = Torrent::from_bytes(&torrent(&info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::InvalidField("piece length")));
    }

    #[test]
    fn test_missing_announce_fails() {
        let data = format!("d4:info{}e", single_info());
        let err = Torrent::from_bytes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TorrentError::MissingRequiredField("announce")));
    }

    #[test]
    fn test_invalid_announce_fails() {
        let data = format!("d8:announce{}4:info{}e", bstr("not a url"), single_info());
        let err = Torrent::from_bytes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TorrentError::InvalidUrl(u) if u == "not a url"));

        let data = format!("d8:announcei1e4:info{}e", single_info());
        let err = Torrent::from_bytes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TorrentError::InvalidUrl(_)));
    }

    #[test]
    fn test_missing_info_fails() {
        let data = format!("d8:announce{}e", bstr(ANNOUNCE));
        let err = Torrent::from_bytes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TorrentError::MissingRequiredField("info")));

        let data = format!("d8:announce{}4:infoli1eee", bstr(ANNOUNCE));
        let err = Torrent::from_bytes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, TorrentError::InvalidField("info")));

        let err = Torrent::from_bytes(b"li1ee").unwrap_err();
        assert!(matches!(err, TorrentError::InvalidField("root")));
    }

    #[test]
    fn test_no_files_fails() {
        let info = format!("d4:name1:x12:piece lengthi1e6:pieces{}e", pieces(20));
        let err = Torrent::from_bytes(&torrent(&info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::NoFilesDescribed));

        // an empty file list does not fall back to single-file mode
        let info = format!("d5:filesle6:lengthi1e4:name1:x12:piece lengthi1e6:pieces{}e", pieces(20));
        let err = Torrent::from_bytes(&torrent(&info, "")).unwrap_err();
        assert!(matches!(err, TorrentError::NoFilesDescribed));
    }

    #[test]
    fn test_decode_errors_propagate() {
        let err = Torrent::from_bytes(b"d8:announce").unwrap_err();
        assert!(matches!(err, TorrentError::Bencode(_)));
    }

    #[test]
    fn test_announce_list_is_flattened() {
        let list = format!(
            "13:announce-listll{}e{}l{}l{}eei7ee",
            bstr("http://a.example/ann"),
            bstr("garbage"),
            bstr("udp://b.example:8080"),
            bstr("http://c.example/ann"),
        );
        let t = Torrent::from_bytes(&torrent(&single_info(), &list)).unwrap();
        let urls: Vec<&str> = t.announce_list().iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["http://a.example/ann", "udp://b.example:8080", "http://c.example/ann"]);
    }

    #[test]
    fn test_announce_list_falls_back_to_announce() {
        let list = format!("13:announce-listll{}ee", bstr("garbage"));
        let t = Torrent::from_bytes(&torrent(&single_info(), &list)).unwrap();
        assert_eq!(t.announce_list(), &[t.announce().clone()]);
    }

    #[test]
    fn test_optional_metadata() {
        let extra = format!(
            "7:comment{}10:created by{}13:creation datei1700000000e",
            bstr("hello"),
            bstr("rusbit")
        );
        let t = Torrent::from_bytes(&torrent(&single_info(), &extra)).unwrap();
        assert_eq!(t.comment(), Some("hello"));
        assert_eq!(t.created_by(), Some("rusbit"));
        assert_eq!(t.creation_date().map(|d| d.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_private_flag() {
        let info = format!("d6:lengthi1e4:name1:x12:piece lengthi1e6:pieces{}7:privatei1ee", pieces(20));
        assert!(Torrent::from_bytes(&torrent(&info, "")).unwrap().is_private());
    }

    #[test]
    fn test_equality_is_content_hash() {
        let a = Torrent::from_bytes(&torrent(&single_info(), "")).unwrap();
        let b = Torrent::from_bytes(&torrent(&single_info(), &format!("7:comment{}", bstr("x")))).unwrap();
        let c = Torrent::from_bytes(&torrent(&multi_info(), "")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_piece_size() {
        let t = Torrent::from_bytes(&torrent(&multi_info(), "")).unwrap();
        assert_eq!(t.piece_size(0), Some(4));
        assert_eq!(t.piece_size(1), Some(4));
        assert_eq!(t.piece_size(2), Some(2));
        assert_eq!(t.piece_size(3), None);

        let t = Torrent::from_bytes(&torrent(&single_info(), "")).unwrap();
        assert_eq!(t.piece_size(0), Some(12));
    }

    #[test]
    fn test_magnet_uri() {
        let t = Torrent::from_bytes(&torrent(&single_info(), "")).unwrap();
        assert_eq!(
            t.magnet_uri(),
            format!(
                "magnet:?xt=urn:btih:{}&dn=test.txt&tr=http%3A%2F%2Ftracker.example.com%2Fannounce",
                SINGLE_HASH
            )
        );
    }

    #[test]
    fn test_generic_access_through_descriptor() {
        let t = Torrent::from_bytes(&torrent(&single_info(), "")).unwrap();
        let info = t.get("info").unwrap();
        assert_eq!(info.get("length").and_then(BValue::as_integer), Some(12));
        assert!(t.root().as_dict().unwrap().contains_key("announce"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.torrent");
        std::fs::write(&path, torrent(&single_info(), "")).unwrap();
        let t = Torrent::from_file(&path).unwrap();
        assert_eq!(t.content_hash(), SINGLE_HASH);

        let err = Torrent::from_file(dir.path().join("missing.torrent")).unwrap_err();
        assert!(matches!(err, TorrentError::Io(_)));
    }
}
