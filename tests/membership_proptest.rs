//! Property-based tests for group membership
//!
//! Random join/leave sequences are checked against a plain set model: every
//! outcome (ack, conflict, forbidden) and the stored member count must
//! agree with the model after each step.

mod common;

use std::collections::BTreeSet;

use chatgate::shared::{ClientIntent, ServerEvent};
use common::TestGateway;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Join(usize),
    Leave(usize),
}

fn op_strategy(users: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..users).prop_map(Op::Join),
        (0..users).prop_map(Op::Leave),
    ]
}

const USERS: usize = 3;

fn run_ops(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let t = TestGateway::new();
        let owner = t.seed_user("owner").await;
        let group = t.create_group(&owner, "Model").await;

        let mut clients = Vec::with_capacity(USERS);
        for i in 0..USERS {
            let user = t.seed_user(&format!("member{}", i)).await;
            clients.push(t.connect(&user).await);
        }

        let mut model: BTreeSet<usize> = BTreeSet::new();
        for op in ops {
            let (reply, expected_ok) = match op {
                Op::Join(i) => {
                    let reply = clients[i]
                        .send(&t.gateway, ClientIntent::JoinGroup { group_id: group.id })
                        .await;
                    (reply, model.insert(i))
                }
                Op::Leave(i) => {
                    let reply = clients[i]
                        .send(&t.gateway, ClientIntent::LeaveGroup { group_id: group.id })
                        .await;
                    (reply, model.remove(&i))
                }
            };

            match (&op, expected_ok, &reply) {
                (Op::Join(_), true, ServerEvent::GroupJoined { .. }) => {}
                (Op::Leave(_), true, ServerEvent::GroupLeft { .. }) => {}
                (Op::Join(_), false, ServerEvent::Error { code, .. }) => {
                    prop_assert_eq!(code.as_str(), "conflict")
                }
                (Op::Leave(_), false, ServerEvent::Error { code, .. }) => {
                    prop_assert_eq!(code.as_str(), "forbidden")
                }
                _ => prop_assert!(false, "{:?} gave unexpected reply {:?}", op, reply),
            }

            let members = t
                .gateway
                .router()
                .list_group_members(group.id)
                .await
                .unwrap();
            // the owner stays a member throughout
            prop_assert_eq!(members.len(), model.len() + 1);
        }

        for (i, client) in clients.iter_mut().enumerate() {
            client.inbox.sync();
            let subscribed = client
                .inbox
                .is_subscribed(chatgate::backend::realtime::RoomId::Group(group.id));
            prop_assert_eq!(subscribed, model.contains(&i));
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_membership_matches_model(ops in proptest::collection::vec(op_strategy(USERS), 1..24)) {
        run_ops(ops)?;
    }
}
