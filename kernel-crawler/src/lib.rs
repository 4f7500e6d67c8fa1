// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Kernel header discovery across Linux distribution mirrors.

This crate enumerates the kernel-header (and companion) artifacts
discoverable across a curated set of distribution mirrors, source
repositories and container images, and normalizes each discovered kernel
into a build descriptor ([driverkit::DriverKitConfig]) that a downstream
driver build pipeline can consume.

The layering, leaves first:

- [fetch]: uniform HTTP GET with transparent decompression and
  404-as-absent semantics; [download] adds resumable artifact downloads.
- [repo]: the [repo::Repository] / [repo::Mirror] / [repo::Distro]
  interfaces everything else implements.
- [rpm] and [deb]: the two binary repository families.
- [git] and [container]: discovery for source-tree and container-probed
  distributions.
- [distro]: the per-distribution adapters.
- [crawler]: the dispatcher tying it all together.
*/

pub mod container;
pub mod crawler;
pub mod deb;
pub mod distro;
pub mod download;
pub mod driverkit;
pub mod error;
pub mod fetch;
pub mod git;
pub mod listing;
pub mod repo;
pub mod rpm;

pub use crate::error::{CrawlError, Result};
