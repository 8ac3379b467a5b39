// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fuser adapter
//!
//! Implements `fuser::Filesystem` by handing each kernel request to
//! [`RemoteFsBridge`] on the tokio runtime and replying from the spawned task,
//! so slow remote calls do not block the FUSE session thread.

use super::bridge::{EntryKind, RemoteFsBridge};
use crate::domain::file_info::FileInfo;
use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    Request,
};
use libc::c_int;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tracing::info;

const BLOCK_SIZE: u32 = 512;

pub struct RemoteFsAdapter {
    bridge: Arc<RemoteFsBridge>,
    runtime: Handle,
    attr_ttl: Duration,
    entry_ttl: Duration,
}

impl RemoteFsAdapter {
    pub fn new(bridge: Arc<RemoteFsBridge>, runtime: Handle, attr_ttl: Duration, entry_ttl: Duration) -> Self {
        Self {
            bridge,
            runtime,
            attr_ttl,
            entry_ttl,
        }
    }
}

fn to_system_time(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

fn file_type(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::Symlink => FileType::Symlink,
        EntryKind::File => FileType::RegularFile,
    }
}

/// Kernel attributes for a remote entry
pub fn file_attr(ino: u64, info: &FileInfo) -> FileAttr {
    let kind = EntryKind::of(info);
    FileAttr {
        ino,
        size: info.size,
        blocks: info.size.div_ceil(BLOCK_SIZE as u64),
        atime: to_system_time(info.access_time),
        mtime: to_system_time(info.mod_time),
        ctime: to_system_time(info.change_time),
        crtime: to_system_time(info.mod_time),
        kind: file_type(kind),
        perm: (info.mode & 0o7777) as u16,
        nlink: if kind == EntryKind::Directory { 2 } else { 1 },
        uid: info.uid,
        gid: info.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

impl fuser::Filesystem for RemoteFsAdapter {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        info!(
            "Remote filesystem adapter initialized (attr_ttl={:?}, entry_ttl={:?})",
            self.attr_ttl, self.entry_ttl
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!("Remote filesystem adapter destroyed");
    }

    fn forget(&mut self, _req: &Request, ino: u64, nlookup: u64) {
        self.bridge.forget(ino, nlookup);
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str().map(str::to_owned) else {
            reply.error(libc::ENOENT);
            return;
        };
        let bridge = self.bridge.clone();
        let ttl = self.entry_ttl;
        self.runtime.spawn(async move {
            match bridge.lookup(parent, &name).await {
                Ok((ino, info)) => reply.entry(&ttl, &file_attr(ino, &info), 0),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let bridge = self.bridge.clone();
        let ttl = self.attr_ttl;
        self.runtime.spawn(async move {
            match bridge.getattr(ino).await {
                Ok(info) => reply.attr(&ttl, &file_attr(ino, &info)),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            match bridge.open(ino, flags).await {
                Ok(fh) => reply.opened(fh, 0),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            match bridge.read(fh, offset, size).await {
                Ok(data) => reply.data(&data),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            match bridge.release(fh).await {
                Ok(()) => reply.ok(),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let bridge = self.bridge.clone();
        self.runtime.spawn(async move {
            match bridge.opendir(ino).await {
                Ok(fh) => reply.opened(fh, 0),
                Err(errno) => reply.error(errno),
            }
        });
    }

    fn readdir(&mut self, _req: &Request, _ino: u64, fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let entries = match self.bridge.readdir(fh) {
            Ok(entries) => entries,
            Err(errno) => {
                reply.error(errno);
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, entry) in entries.iter().enumerate().skip(skip) {
            // Offset of the next entry; true means the reply buffer is full
            if reply.add(entry.ino, (i + 1) as i64, file_type(entry.kind), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        self.bridge.releasedir(fh);
        reply.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_attr_from_info() {
        let info = FileInfo {
            name: "a.txt".into(),
            size: 1025,
            mod_time: 1_700_000_000,
            access_time: 1_700_000_100,
            change_time: 1_700_000_200,
            mode: 0o644,
            ..Default::default()
        };
        let attr = file_attr(7, &info);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.blocks, 3);
        assert_eq!(attr.nlink, 1);
        assert_eq!(attr.mtime, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    }

    #[test]
    fn test_type_bits() {
        let dir = FileInfo {
            is_dir: true,
            ..Default::default()
        };
        assert_eq!(file_attr(2, &dir).kind, FileType::Directory);
        assert_eq!(file_attr(2, &dir).nlink, 2);

        let link = FileInfo {
            is_symlink: true,
            ..Default::default()
        };
        assert_eq!(file_attr(3, &link).kind, FileType::Symlink);
    }

    #[test]
    fn test_negative_timestamp() {
        assert_eq!(to_system_time(-5), UNIX_EPOCH - Duration::from_secs(5));
    }
}
