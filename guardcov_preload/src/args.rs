//! Taking the shared map description off the target's command line.

use core::{ffi::CStr, ptr};

use libafl_bolts::{shmem::ShMemDescription, Error};
use libc::c_char;

/// Returns the last argument of `argv`, without changing anything.
///
/// # Safety
/// `argv` has to hold at least `argc` valid entries, as handed to `__libc_start_main`.
pub unsafe fn last_arg<'a>(argc: i32, argv: *const *const c_char) -> Result<&'a CStr, Error> {
    if argc <= 1 {
        return Err(Error::illegal_argument(
            "Did not receive shared memory description",
        ));
    }
    let last_arg = *argv.add((argc - 1) as usize);
    if last_arg.is_null() {
        return Err(Error::illegal_argument(
            "The last argument is null, expecting the shared memory description",
        ));
    }
    Ok(CStr::from_ptr(last_arg))
}

/// Removes the last argument, so the target never sees it: decrements `argc` and nulls the slot.
///
/// # Safety
/// `argv` has to hold at least `argc` valid entries, and `argc` has to be at least `1`.
pub unsafe fn strip_last_arg(argc: &mut i32, argv: *mut *const c_char) {
    *argc -= 1;
    *argv.add(*argc as usize) = ptr::null();
}

/// Parses the last argument as a [`ShMemDescription`] and strips it from `argv`.
///
/// The argument is only removed if it parsed. On error, `argc` and `argv` are left as they were.
///
/// # Safety
/// `argv` has to hold at least `argc` valid entries, as handed to `__libc_start_main`.
pub unsafe fn take_description(
    argc: &mut i32,
    argv: *mut *const c_char,
) -> Result<ShMemDescription, Error> {
    let arg = last_arg(*argc, argv)?
        .to_str()
        .map_err(|e| Error::illegal_argument(format!("Argument is not valid UTF-8: {e}")))?;
    let description = parse_description(arg)?;
    strip_last_arg(argc, argv);
    Ok(description)
}

/// Parses a [`ShMemDescription`] serialized as JSON.
pub fn parse_description(description: &str) -> Result<ShMemDescription, Error> {
    serde_json::from_str(description).map_err(|e| {
        Error::serialize(format!(
            "Could not parse shared memory description {description:?}: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::{ffi::CString, ptr};

    use libafl_bolts::{shmem::ShMemDescription, Error};
    use libc::c_char;

    use super::{last_arg, parse_description, take_description};

    fn raw_argv(args: &[CString]) -> Vec<*const c_char> {
        args.iter()
            .map(|arg| arg.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect()
    }

    fn description_json() -> String {
        serde_json::to_string(&ShMemDescription::from_string_and_size("/guardcov_args", 4)).unwrap()
    }

    #[test]
    fn test_take_description() {
        let args = [
            CString::new("./target").unwrap(),
            CString::new("input").unwrap(),
            CString::new(description_json()).unwrap(),
        ];
        let mut argv = raw_argv(&args);
        let mut argc = 3;

        let description = unsafe { take_description(&mut argc, argv.as_mut_ptr()) }.unwrap();
        assert_eq!(description.size, 4);
        assert_eq!(argc, 2);
        assert!(argv[2].is_null());
        assert_eq!(argv[1], args[1].as_ptr());
    }

    #[test]
    fn test_malformed_description_keeps_argv() {
        let args = [
            CString::new("./target").unwrap(),
            CString::new("input").unwrap(),
        ];
        let mut argv = raw_argv(&args);
        let mut argc = 2;

        let res = unsafe { take_description(&mut argc, argv.as_mut_ptr()) };
        assert!(matches!(res, Err(Error::Serialize(..))));
        assert_eq!(argc, 2);
        assert_eq!(argv[1], args[1].as_ptr());
    }

    #[test]
    fn test_no_description() {
        let args = [CString::new("./target").unwrap()];
        let mut argv = raw_argv(&args);
        let mut argc = 1;

        let res = unsafe { take_description(&mut argc, argv.as_mut_ptr()) };
        assert!(matches!(res, Err(Error::IllegalArgument(..))));
        assert_eq!(argc, 1);
        assert_eq!(argv[0], args[0].as_ptr());
    }

    #[test]
    fn test_invalid_utf8() {
        let args = [
            CString::new("./target").unwrap(),
            CString::new(vec![0xff, 0xfe]).unwrap(),
        ];
        let mut argv = raw_argv(&args);
        let mut argc = 2;

        let res = unsafe { take_description(&mut argc, argv.as_mut_ptr()) };
        assert!(matches!(res, Err(Error::IllegalArgument(..))));
        assert_eq!(argc, 2);
        assert!(!argv[1].is_null());
    }

    #[test]
    fn test_last_arg_peeks() {
        let args = [
            CString::new("./target").unwrap(),
            CString::new("input").unwrap(),
        ];
        let argv = raw_argv(&args);

        let last = unsafe { last_arg(2, argv.as_ptr()) }.unwrap();
        assert_eq!(last.to_str().unwrap(), "input");
        assert_eq!(argv[1], args[1].as_ptr());
    }

    #[test]
    fn test_parse_description() {
        let description = ShMemDescription::from_string_and_size("/guardcov_test", 1337);
        let json = serde_json::to_string(&description).unwrap();

        let parsed = parse_description(&json).unwrap();
        assert_eq!(parsed.size, 1337);
        assert_eq!(parsed.id, description.id);
    }

    #[test]
    fn test_parse_garbage() {
        let res = parse_description("not json at all");
        assert!(matches!(res, Err(Error::Serialize(..))));
    }
}
