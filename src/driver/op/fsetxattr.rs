use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;

use io_uring::{opcode, types};

use crate::driver::{Completable, CqeResult, Op};

#[allow(dead_code)]
pub(crate) struct Fsetxattr {
    name: CString,
    value: Vec<u8>,
}

impl Op<Fsetxattr> {
    pub(crate) fn fsetxattr(
        fd: RawFd,
        name: &str,
        value: &[u8],
        flags: libc::c_int,
    ) -> io::Result<Op<Fsetxattr>> {
        let attr = Fsetxattr {
            name: CString::new(name)?,
            value: value.to_vec(),
        };
        let entry = opcode::FSetXattr::new(
            types::Fd(fd),
            attr.name.as_ptr(),
            attr.value.as_ptr() as *const _,
            attr.value.len() as u32,
        )
        .flags(flags)
        .build();
        Op::submit(attr, entry)
    }
}

impl Completable for Fsetxattr {
    type Output = io::Result<()>;

    fn complete(self, cqe: CqeResult) -> Self::Output {
        cqe.result?;
        Ok(())
    }
}
