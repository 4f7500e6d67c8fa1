// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Container command execution via the local Docker daemon.

Closed mirrors are probed by asking a running image's package manager
directly: pull the image, run one command in a throwaway container, collect
its output lines, remove the container.
*/

use {
    crate::error::Result,
    bollard::{
        container::{Config, LogsOptions, RemoveContainerOptions},
        image::CreateImageOptions,
        Docker,
    },
    futures::StreamExt,
};

/// A container image to run probe commands in.
pub struct Container {
    image: String,
}

impl Container {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Run `cmd` in a fresh container and return its output lines.
    ///
    /// stdout and stderr are interleaved, the way an attached `docker run`
    /// would show them.
    pub async fn run_cmd(&self, cmd: &[&str]) -> Result<Vec<String>> {
        let docker = Docker::connect_with_local_defaults()?;

        log::info!("[{}] pulling image", self.image);
        let mut pull = docker.create_image(
            Some(CreateImageOptions {
                from_image: self.image.clone(),
                ..Default::default()
            }),
            None,
            None,
        );
        while let Some(progress) = pull.next().await {
            progress?;
        }

        log::info!("[{}] running command {:?}", self.image, cmd);
        let container = docker
            .create_container::<String, String>(
                None,
                Config {
                    image: Some(self.image.clone()),
                    cmd: Some(cmd.iter().map(|arg| arg.to_string()).collect()),
                    ..Default::default()
                },
            )
            .await?;

        docker
            .start_container::<String>(&container.id, None)
            .await?;

        let mut logs = docker.logs::<String>(
            &container.id,
            Some(LogsOptions {
                follow: true,
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );

        let mut lines = vec![];
        while let Some(chunk) = logs.next().await {
            let chunk = chunk?;
            let text = String::from_utf8_lossy(&chunk.into_bytes()).into_owned();
            lines.extend(
                text.split('\n')
                    .filter(|line| !line.is_empty())
                    .map(|line| line.to_string()),
            );
        }

        docker
            .remove_container(
                &container.id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;

        Ok(lines)
    }
}
