// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis store
//!
//! Commands share one multiplexed connection. Blocking stream reads use a
//! second connection so an `XREAD BLOCK` never stalls lock traffic.

use super::{Batch, Op, Reply, Store, StoreError};
use crate::stream::{ReadFrom, StreamEntry, StreamId};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.kind() == redis::ErrorKind::NoScriptError {
            StoreError::NoScript(e.to_string())
        } else if e.is_io_error()
            || e.is_connection_dropped()
            || e.is_connection_refusal()
            || e.is_timeout()
        {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    commands: MultiplexedConnection,
    reads: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to `redis://host:port[/db]`
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let commands = client.get_multiplexed_async_connection().await?;
        let reads = client.get_multiplexed_async_connection().await?;
        tracing::debug!(url, "connected to redis");
        Ok(Self { commands, reads })
    }
}

fn reply_from_value(value: redis::Value) -> Result<Reply, StoreError> {
    match value {
        redis::Value::Nil => Ok(Reply::Nil),
        redis::Value::Okay => Ok(Reply::Ok),
        redis::Value::Int(n) => Ok(Reply::Int(n)),
        redis::Value::SimpleString(s) if s == "OK" => Ok(Reply::Ok),
        redis::Value::SimpleString(s) => Ok(Reply::Str(s)),
        redis::Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Reply::Str)
            .map_err(|e| StoreError::UnexpectedReply(format!("non-utf8 value: {e}"))),
        other => Err(StoreError::UnexpectedReply(format!("{other:?}"))),
    }
}

fn entry_from_redis(raw: redis::streams::StreamId) -> Result<StreamEntry, StoreError> {
    let id: StreamId = raw.id.parse()?;
    let mut fields = std::collections::BTreeMap::new();
    for (name, value) in &raw.map {
        let value: String = redis::from_redis_value(value)?;
        fields.insert(name.clone(), value);
    }
    Ok(StreamEntry { id, fields })
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.commands.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.commands.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn exec(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.into_ops() {
            match op {
                Op::Set {
                    key,
                    value,
                    options,
                } => {
                    pipe.cmd("SET").arg(key).arg(value);
                    if options.only_if_absent {
                        pipe.arg("NX");
                    }
                    if let Some(ttl) = options.expire {
                        pipe.arg("PX").arg(ttl.as_millis() as u64);
                    }
                }
                Op::Get { key } => {
                    pipe.cmd("GET").arg(key);
                }
                Op::Del { key } => {
                    pipe.cmd("DEL").arg(key);
                }
            }
        }

        let mut conn = self.commands.clone();
        let values: Vec<redis::Value> = pipe.query_async(&mut conn).await?;
        values.into_iter().map(reply_from_value).collect()
    }

    async fn script_load(&self, body: &str) -> Result<String, StoreError> {
        let mut conn = self.commands.clone();
        let digest: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(body)
            .query_async(&mut conn)
            .await?;
        Ok(digest)
    }

    async fn eval_digest(
        &self,
        digest: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Reply, StoreError> {
        let mut conn = self.commands.clone();
        let value: redis::Value = redis::cmd("EVALSHA")
            .arg(digest)
            .arg(keys.len())
            .arg(keys)
            .arg(args)
            .query_async(&mut conn)
            .await?;
        reply_from_value(value)
    }

    async fn append(
        &self,
        stream: &str,
        fields: &[(&str, String)],
        max_len: Option<usize>,
    ) -> Result<StreamId, StoreError> {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(stream);
        if let Some(max_len) = max_len {
            cmd.arg("MAXLEN").arg("~").arg(max_len);
        }
        cmd.arg("*");
        for (name, value) in fields {
            cmd.arg(*name).arg(value);
        }
        let mut conn = self.commands.clone();
        let id: String = cmd.query_async(&mut conn).await?;
        id.parse()
    }

    async fn last_id(&self, stream: &str) -> Result<Option<StreamId>, StoreError> {
        let mut conn = self.commands.clone();
        let reply: redis::streams::StreamRangeReply = redis::cmd("XREVRANGE")
            .arg(stream)
            .arg("+")
            .arg("-")
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await?;
        reply
            .ids
            .into_iter()
            .next()
            .map(|raw| raw.id.parse())
            .transpose()
    }

    async fn read_blocking(
        &self,
        stream: &str,
        from: &ReadFrom,
        block: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let mut conn = self.reads.clone();
        let reply: Option<redis::streams::StreamReadReply> = redis::cmd("XREAD")
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(stream)
            .arg(from.to_string())
            .query_async(&mut conn)
            .await?;

        let Some(reply) = reply else {
            return Ok(Vec::new());
        };
        reply
            .keys
            .into_iter()
            .flat_map(|key| key.ids)
            .map(entry_from_redis)
            .collect()
    }
}
